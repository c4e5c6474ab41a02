//! Linked-haplotype calling from co-named read groups.

use std::io::BufRead;

use crate::cigar::CigarOp;
use crate::error::Error;
use crate::sam::AlignmentRecord;

/// Genotype placeholder for sites without a concordant, quality-passing
/// base call.
pub const NO_CALL: u8 = b'N';

/// Thresholds and target for haplotype calling.
#[derive(Debug, Clone)]
pub struct CallerConfig {
    /// Chromosome the query sites live on.
    pub chromosome: String,
    /// A base votes only when its decoded quality exceeds this.
    pub base_quality: i64,
    /// A group survives only when every member reaches this mapping quality.
    pub map_quality: i64,
}

/// Reads one-indexed query sites, one per line, returning them zero-indexed
/// in file order.
pub fn read_query_sites<R: BufRead>(reader: R) -> Result<Vec<i64>, Error> {
    let mut sites = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let site: i64 = trimmed
            .parse()
            .map_err(|_| Error::Parse(format!("invalid query site: '{trimmed}'")))?;
        sites.push(site - 1);
    }
    Ok(sites)
}

/// Groups adjacent records sharing a query name and calls each group.
///
/// Grouping relies on co-named records being adjacent in the stream; that
/// ordering is the caller's responsibility and is not validated here. The
/// group still open at end of input is evaluated like any other.
pub struct GroupedCaller<'a> {
    config: &'a CallerConfig,
    sites: &'a [i64],
    current_name: Option<String>,
    group: Vec<AlignmentRecord>,
}

impl<'a> GroupedCaller<'a> {
    #[must_use]
    pub fn new(config: &'a CallerConfig, sites: &'a [i64]) -> Self {
        Self {
            config,
            sites,
            current_name: None,
            group: Vec::new(),
        }
    }

    /// Feeds one record; returns a haplotype row when the record closes a
    /// group that produced one.
    pub fn push(&mut self, record: AlignmentRecord) -> Result<Option<Vec<u8>>, Error> {
        if self.current_name.as_deref() == Some(record.query_name.as_str()) {
            self.group.push(record);
            return Ok(None);
        }
        let finished = self.take_group()?;
        self.current_name = Some(record.query_name.clone());
        self.group.push(record);
        Ok(finished)
    }

    /// Evaluates the final group once the input is exhausted.
    pub fn finish(&mut self) -> Result<Option<Vec<u8>>, Error> {
        let finished = self.take_group()?;
        self.current_name = None;
        Ok(finished)
    }

    fn take_group(&mut self) -> Result<Option<Vec<u8>>, Error> {
        if self.group.is_empty() {
            return Ok(None);
        }
        let group: Vec<AlignmentRecord> = self.group.drain(..).collect();
        call_group(&group, self.sites, self.config)
    }
}

/// Calls one read group across the query sites.
///
/// Returns the genotype vector in query-site order, or `None` when the
/// group is filtered out or every site stays uncalled.
pub fn call_group(
    group: &[AlignmentRecord],
    sites: &[i64],
    config: &CallerConfig,
) -> Result<Option<Vec<u8>>, Error> {
    if group.is_empty() || sites.is_empty() || !group_passes_filters(group, config) {
        return Ok(None);
    }

    // A member whose footprint misses the query window entirely is still
    // tolerated here; it simply holds no votes below.

    let expanded: Vec<Vec<CigarOp>> = group
        .iter()
        .map(AlignmentRecord::expanded_cigar)
        .collect::<Result<_, _>>()?;

    let mut haplotype = vec![NO_CALL; sites.len()];
    let mut non_empty = false;

    for (slot, &site) in haplotype.iter_mut().zip(sites) {
        for (record, tags) in group.iter().zip(&expanded) {
            // Strictly inside the record span; a site exactly at the record
            // start never votes.
            if !(site > record.position
                && site < record.position + record.sequence.len() as i64)
            {
                continue;
            }

            // Soft-clipped bases advance neither the reference position nor
            // the vote; only M-tagged bases track the reference here.
            let mut ref_pos = record.position;
            for (k, tag) in tags.iter().enumerate() {
                if *tag != CigarOp::Match {
                    continue;
                }
                if ref_pos == site && record.base_quality(k) > config.base_quality {
                    let genotype = record.sequence[k];
                    // Concordance across the group: the first vote stands,
                    // and any disagreement voids the site.
                    if *slot == NO_CALL {
                        *slot = genotype;
                        non_empty = true;
                    } else if *slot != genotype {
                        *slot = NO_CALL;
                    }
                }
                ref_pos += 1;
            }
        }
    }

    Ok(non_empty.then_some(haplotype))
}

fn group_passes_filters(group: &[AlignmentRecord], config: &CallerConfig) -> bool {
    group.iter().all(|r| {
        !r.is_unmapped()
            && !r.is_secondary()
            && r.chromosome == config.chromosome
            && r.map_quality >= config.map_quality
            && !r.contains_indel()
    })
}

/// Renders the one-indexed header row of query sites.
#[must_use]
pub fn format_header(sites: &[i64]) -> String {
    sites
        .iter()
        .map(|s| (s + 1).to_string())
        .collect::<Vec<_>>()
        .join("\t")
}

/// Renders a haplotype row; every genotype is tab-terminated.
#[must_use]
pub fn format_row(haplotype: &[u8]) -> String {
    haplotype.iter().map(|&g| format!("{}\t", g as char)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn config() -> CallerConfig {
        CallerConfig {
            chromosome: "4-HA".to_string(),
            base_quality: 20,
            map_quality: 20,
        }
    }

    fn record(name: &str, pos_1idx: i64, cigar: &str, seq: &str) -> AlignmentRecord {
        let qual = "I".repeat(seq.len());
        AlignmentRecord::parse(&format!(
            "{name}\t99\t4-HA\t{pos_1idx}\t60\t{cigar}\t=\t0\t100\t{seq}\t{qual}"
        ))
        .unwrap()
    }

    #[test]
    fn read_sites_one_indexed() {
        let sites = read_query_sites(Cursor::new("10\n25\n100\n")).unwrap();
        assert_eq!(sites, vec![9, 24, 99]);
        assert!(read_query_sites(Cursor::new("10\nxyz\n")).is_err());
    }

    #[test]
    fn single_read_votes_at_sites() {
        // Read covers zero-indexed 9..19; sites 12 and 15 fall inside.
        let group = [record("r1", 10, "10M", "ACGTACGTAC")];
        let hap = call_group(&group, &[12, 15], &config()).unwrap().unwrap();
        // Offsets 3 and 6 within the read.
        assert_eq!(hap, vec![b'T', b'G']);
    }

    #[test]
    fn site_at_record_start_never_votes() {
        // The containment bound is strictly greater-than, so the first
        // aligned base cannot vote even though it sits on the site.
        let group = [record("r1", 10, "10M", "ACGTACGTAC")];
        assert!(call_group(&group, &[9], &config()).unwrap().is_none());
    }

    #[test]
    fn soft_clips_do_not_advance_reference() {
        // 3S7M starting at zero-indexed 9: aligned bases are offsets 3..10.
        let group = [record("r1", 10, "3S7M", "ACGTACGTAC")];
        let hap = call_group(&group, &[12], &config()).unwrap().unwrap();
        // ref 9->offset 3, 10->4, 11->5, 12->6.
        assert_eq!(hap, vec![b'G']);
    }

    #[test]
    fn uncovered_site_stays_uncalled() {
        let group = [record("r1", 10, "10M", "ACGTACGTAC")];
        let hap = call_group(&group, &[12, 100], &config()).unwrap().unwrap();
        assert_eq!(hap, vec![b'T', NO_CALL]);
    }

    #[test]
    fn concordant_pair_links_sites() {
        let group = [
            record("r1", 10, "10M", "ACGTACGTAC"),
            record("r1", 14, "10M", "ACGTACGTAC"),
        ];
        // Site 15: read one offset 6 = 'G'; read two offset 2 = 'G'.
        let hap = call_group(&group, &[15], &config()).unwrap().unwrap();
        assert_eq!(hap, vec![b'G']);
    }

    #[test]
    fn discordant_pair_voids_the_site() {
        let group = [
            record("r1", 10, "10M", "ACGTACGTAC"),
            record("r1", 14, "10M", "TTTTTTTTTT"),
        ];
        // Site 15 reads 'G' in one mate and 'T' in the other.
        assert!(call_group(&group, &[15], &config()).unwrap().is_none());
    }

    #[test]
    fn discordant_site_voids_but_group_survives_elsewhere() {
        let group = [
            record("r1", 10, "10M", "ACGTACGTAC"),
            record("r1", 14, "10M", "TTTTTTTTTT"),
        ];
        // Site 12 is covered by the first mate only.
        let hap = call_group(&group, &[12, 15], &config()).unwrap().unwrap();
        assert_eq!(hap, vec![b'T', NO_CALL]);
    }

    #[test]
    fn low_quality_base_does_not_vote() {
        let mut rec = record("r1", 10, "10M", "ACGTACGTAC");
        rec.quality = b"III5IIIIII".to_vec(); // offset 3 has q20, not above
        assert!(call_group(&[rec], &[12], &config()).unwrap().is_none());
    }

    #[test]
    fn any_failing_member_rejects_the_whole_group() {
        let good = record("r1", 10, "10M", "ACGTACGTAC");

        let mut unmapped = record("r1", 10, "10M", "ACGTACGTAC");
        unmapped.cigar = "*".to_string();
        assert!(
            call_group(&[good.clone(), unmapped], &[12], &config())
                .unwrap()
                .is_none()
        );

        let mut secondary = record("r1", 10, "10M", "ACGTACGTAC");
        secondary.flag = 272;
        assert!(
            call_group(&[good.clone(), secondary], &[12], &config())
                .unwrap()
                .is_none()
        );

        let mut low_mapq = record("r1", 10, "10M", "ACGTACGTAC");
        low_mapq.map_quality = 19;
        assert!(
            call_group(&[good.clone(), low_mapq], &[12], &config())
                .unwrap()
                .is_none()
        );

        let indel = record("r1", 10, "4M1I5M", "ACGTACGTAC");
        assert!(
            call_group(&[good.clone(), indel], &[12], &config())
                .unwrap()
                .is_none()
        );

        let mut other_chr = record("r1", 10, "10M", "ACGTACGTAC");
        other_chr.chromosome = "6-NA".to_string();
        assert!(
            call_group(&[good, other_chr], &[12], &config())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn member_outside_query_window_is_tolerated() {
        // The second mate maps far from every site; the group still calls.
        let group = [
            record("r1", 10, "10M", "ACGTACGTAC"),
            record("r1", 5000, "10M", "ACGTACGTAC"),
        ];
        let hap = call_group(&group, &[12], &config()).unwrap().unwrap();
        assert_eq!(hap, vec![b'T']);
    }

    #[test]
    fn grouping_by_adjacency_with_final_flush() {
        let config = config();
        let sites = [12i64];
        let mut caller = GroupedCaller::new(&config, &sites);

        assert!(caller
            .push(record("a", 10, "10M", "ACGTACGTAC"))
            .unwrap()
            .is_none());
        assert!(caller
            .push(record("a", 14, "10M", "ACGTACGTAC"))
            .unwrap()
            .is_none());
        // New name closes group "a".
        let row = caller
            .push(record("b", 10, "10M", "CCCCCCCCCC"))
            .unwrap()
            .unwrap();
        assert_eq!(row, vec![b'T']);
        // End of input closes group "b".
        let row = caller.finish().unwrap().unwrap();
        assert_eq!(row, vec![b'C']);
        assert!(caller.finish().unwrap().is_none());
    }

    #[test]
    fn formatting() {
        assert_eq!(format_header(&[9, 24]), "10\t25");
        assert_eq!(format_row(b"ACN"), "A\tC\tN\t");
    }
}
