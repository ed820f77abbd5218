use scraper::{ElementRef, Html, Selector};

use crate::extract::rules::{BlockRules, OddsRule, SportRules};
use crate::types::{MatchRecord, Odds, TeamPair};

/// Lazily walks every match block in `doc` and yields the valid records.
///
/// Blocks without two team names are skipped. Missing score cells default to
/// "0" per side; missing or unreadable odds default to 0.0. The iterator
/// borrows the parsed document, so a fresh one is needed per render.
pub fn extract<'a>(
    doc: &'a Html,
    blocks: &'a BlockRules,
    sport: &'a SportRules,
) -> impl Iterator<Item = MatchRecord> + 'a {
    doc.select(&blocks.block)
        .filter_map(move |block| parse_block(block, blocks, sport))
}

fn parse_block(block: ElementRef<'_>, blocks: &BlockRules, sport: &SportRules) -> Option<MatchRecord> {
    let teams = TeamPair::new(
        first_text(block, &blocks.home_team).unwrap_or_default(),
        first_text(block, &blocks.away_team).unwrap_or_default(),
    )?;

    let time = first_text(block, &blocks.time).unwrap_or_default();

    let score_home = first_text(block, &sport.score.home).unwrap_or_else(|| "0".to_string());
    let score_away = first_text(block, &sport.score.away).unwrap_or_else(|| "0".to_string());

    Some(MatchRecord {
        teams,
        score: format!("{score_home}-{score_away}"),
        odds: read_odds(block, &sport.odds, &blocks.odds_value),
        time,
        sport: sport.name.clone(),
    })
}

fn read_odds(block: ElementRef<'_>, rule: &OddsRule, value: &Selector) -> Odds {
    // Only the first matching item counts; a blank price is 0, never the
    // next item's.
    let price = |item: &Selector| {
        block
            .select(item)
            .next()
            .and_then(|el| first_text(el, value))
            .map(|text| parse_odds(&text))
            .unwrap_or(0.0)
    };
    Odds {
        home: price(&rule.home),
        draw: rule.draw.as_ref().map(price).unwrap_or(0.0),
        away: price(&rule.away),
    }
}

/// Trimmed text of the first descendant matching `sel`; None when absent or blank.
fn first_text(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Reads the leading decimal number of `text` ("1.85", "2.10 ↑", "3,").
/// Anything without a leading number, or a negative/non-finite value, is 0.
pub fn parse_odds(text: &str) -> f64 {
    let s = text.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '0'..='9' => {
                seen_digit = true;
                end = i + 1;
            }
            '.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            '+' | '-' if i == 0 => end = 1,
            _ => break,
        }
    }
    if !seen_digit {
        return 0.0;
    }
    match s[..end].trim_end_matches('.').parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}
