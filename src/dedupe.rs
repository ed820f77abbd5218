use std::collections::HashSet;

use crate::types::MatchRecord;

/// Collapses repeated observations from one cycle. The key is
/// (home, away, time, sport); the first record per key wins and first-seen
/// order is kept. Two snapshots of the same fixture under different clock
/// labels are both kept.
pub fn dedupe(records: impl IntoIterator<Item = MatchRecord>) -> Vec<MatchRecord> {
    let mut seen: HashSet<(String, String, String, String)> = HashSet::new();
    records
        .into_iter()
        .filter(|r| {
            seen.insert((
                r.teams.home().to_string(),
                r.teams.away().to_string(),
                r.time.clone(),
                r.sport.clone(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Odds, TeamPair};

    fn rec(home: &str, away: &str, time: &str, sport: &str, score: &str) -> MatchRecord {
        MatchRecord {
            teams: TeamPair::new(home, away).unwrap(),
            score: score.to_string(),
            odds: Odds::default(),
            time: time.to_string(),
            sport: sport.to_string(),
        }
    }

    #[test]
    fn keeps_first_of_each_key() {
        let out = dedupe(vec![
            rec("A", "B", "45'", "soccer", "1-0"),
            rec("A", "B", "45'", "soccer", "9-9"),
            rec("C", "D", "10'", "soccer", "0-0"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].score, "1-0");
        assert_eq!(out[1].teams.home(), "C");
    }

    #[test]
    fn different_time_labels_both_survive() {
        let out = dedupe(vec![
            rec("Team A", "Team B", "45'", "soccer", "0-0"),
            rec("Team A", "Team B", "HT", "soccer", "0-0"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn sport_and_team_order_are_part_of_the_key() {
        let out = dedupe(vec![
            rec("A", "B", "1", "tennis", "0-0"),
            rec("A", "B", "1", "table-tennis", "0-0"),
            rec("B", "A", "1", "tennis", "0-0"),
        ]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn delimiter_in_names_does_not_collide() {
        let out = dedupe(vec![
            rec("A|B", "C", "x", "soccer", "0-0"),
            rec("A", "B|C", "x", "soccer", "0-0"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn idempotent_and_never_grows() {
        let input = vec![
            rec("A", "B", "1'", "soccer", "0-0"),
            rec("A", "B", "1'", "soccer", "0-0"),
            rec("A", "B", "2'", "soccer", "0-0"),
            rec("E", "F", "", "snooker", "0-0"),
            rec("E", "F", "", "snooker", "1-0"),
        ];
        let once = dedupe(input.clone());
        let twice = dedupe(once.clone());
        assert!(once.len() <= input.len());
        assert_eq!(once, twice);
        assert!(dedupe(Vec::new()).is_empty());
    }
}
