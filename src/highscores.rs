//! Hiscore charts
//!
//! One chart per level set, ten entries each. Persisted as key=value text.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::persistence::{KvDoc, PersistError};

/// Entries shown per chart
pub const CHART_SIZE: usize = 10;

const EMPTY_NAME: &str = "______";

/// A single chart entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartEntry {
    pub name: String,
    /// Level reached
    pub level: u32,
    pub score: i32,
    /// Added by the last call to [`HiscoreChart::add`]
    #[serde(default)]
    pub new_entry: bool,
}

/// Chart of one level set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiscoreChart {
    pub name: String,
    entries: Vec<ChartEntry>,
}

impl HiscoreChart {
    /// Chart filled with placeholder entries
    pub fn new(name: &str) -> Self {
        let entries = (0..CHART_SIZE)
            .map(|i| ChartEntry {
                name: EMPTY_NAME.to_string(),
                level: 9 - i as u32,
                score: 100_000 - i as i32 * 10_000,
                new_entry: false,
            })
            .collect();
        Self {
            name: name.to_string(),
            entries,
        }
    }

    pub fn entries(&self) -> &[ChartEntry] {
        &self.entries
    }

    pub fn get(&self, id: usize) -> Option<&ChartEntry> {
        let entry = self.entries.get(id);
        if entry.is_none() {
            log::warn!("Hiscore entry {} outside chart", id);
        }
        entry
    }

    /// Overwrite an entry (used when loading)
    pub fn set(&mut self, id: usize, name: &str, level: u32, score: i32) {
        if let Some(e) = self.entries.get_mut(id) {
            *e = ChartEntry {
                name: name.to_string(),
                level,
                score,
                new_entry: false,
            };
        }
    }

    /// Insert a result; ordered by score, equal scores by level. Returns
    /// the 0-based rank if the entry made it onto the chart.
    pub fn add(&mut self, name: &str, level: u32, score: i32) -> Option<usize> {
        for e in &mut self.entries {
            e.new_entry = false;
        }
        self.entries.push(ChartEntry {
            name: name.to_string(),
            level,
            score,
            new_entry: true,
        });
        // Both sorts are stable
        self.entries.sort_by(|a, b| b.level.cmp(&a.level));
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(CHART_SIZE);
        self.entries.iter().position(|e| e.new_entry)
    }

    /// Would `score` make it onto the chart
    pub fn qualifies(&self, score: i32) -> bool {
        self.entries.last().is_none_or(|e| score > e.score)
    }
}

/// All charts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hiscores {
    pub charts: Vec<HiscoreChart>,
}

impl Hiscores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chart for `name`, created if missing
    pub fn get(&mut self, name: &str) -> &mut HiscoreChart {
        let idx = match self.charts.iter().position(|c| c.name == name) {
            Some(i) => i,
            None => {
                log::info!("Hiscore chart '{}' not found, creating empty chart", name);
                self.charts.push(HiscoreChart::new(name));
                self.charts.len() - 1
            }
        };
        &mut self.charts[idx]
    }

    pub fn find(&self, name: &str) -> Option<&HiscoreChart> {
        self.charts.iter().find(|c| c.name == name)
    }

    pub fn to_kv(&self) -> KvDoc {
        let mut doc = KvDoc::new();
        doc.set("chartnum", self.charts.len());
        for (i, chart) in self.charts.iter().enumerate() {
            doc.set(&format!("chart{i}.name"), &chart.name);
            for (j, e) in chart.entries.iter().enumerate() {
                doc.set(&format!("chart{i}.entry{j}.name"), &e.name);
                doc.set(&format!("chart{i}.entry{j}.level"), e.level);
                doc.set(&format!("chart{i}.entry{j}.score"), e.score);
            }
        }
        doc
    }

    pub fn from_kv(doc: &KvDoc) -> Self {
        let mut count = 0usize;
        doc.read_into("chartnum", &mut count);
        let charts = (0..count)
            .map(|i| {
                let mut name = String::new();
                doc.read_into(&format!("chart{i}.name"), &mut name);
                let mut chart = HiscoreChart::new(&name);
                for j in 0..CHART_SIZE {
                    let prefix = format!("chart{i}.entry{j}");
                    let mut entry_name = EMPTY_NAME.to_string();
                    let (mut level, mut score) = (0u32, 0i32);
                    doc.read_into(&format!("{prefix}.name"), &mut entry_name);
                    doc.read_into(&format!("{prefix}.level"), &mut level);
                    doc.read_into(&format!("{prefix}.score"), &mut score);
                    chart.set(j, &entry_name, level, score);
                }
                chart
            })
            .collect();
        Self { charts }
    }

    /// Missing file means no hiscores yet
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            log::info!("No hiscores file {} yet", path.display());
            return Self::new();
        }
        match KvDoc::load(path) {
            Ok(doc) => {
                let scores = Self::from_kv(&doc);
                log::info!("Loaded {} hiscore charts", scores.charts.len());
                scores
            }
            Err(e) => {
                log::error!("Could not read hiscores {}: {e}", path.display());
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        self.to_kv().save(path)?;
        log::info!("Hiscores saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chart_defaults() {
        let chart = HiscoreChart::new("Original");
        assert_eq!(chart.entries().len(), CHART_SIZE);
        assert_eq!(chart.entries()[0].score, 100_000);
        assert_eq!(chart.entries()[0].level, 9);
        assert_eq!(chart.entries()[9].score, 10_000);
        assert_eq!(chart.entries()[9].name, "______");
    }

    #[test]
    fn test_add_ranks_by_score() {
        let mut chart = HiscoreChart::new("x");
        assert_eq!(chart.add("Ann", 3, 55_000), Some(5));
        assert!(chart.entries()[5].new_entry);
        assert_eq!(chart.entries()[5].name, "Ann");
        assert_eq!(chart.entries().len(), CHART_SIZE);

        // Too low: dropped, nothing marked
        assert_eq!(chart.add("Bob", 1, 5), None);
        assert!(chart.entries().iter().all(|e| !e.new_entry));
    }

    #[test]
    fn test_equal_scores_ordered_by_level() {
        let mut chart = HiscoreChart::new("x");
        chart.add("Low", 1, 200_000);
        chart.add("High", 5, 200_000);
        assert_eq!(chart.entries()[0].name, "High");
        assert_eq!(chart.entries()[1].name, "Low");
    }

    #[test]
    fn test_get_creates_missing_chart() {
        let mut hs = Hiscores::new();
        hs.get("A").add("Ann", 2, 150_000);
        hs.get("B");
        assert_eq!(hs.charts.len(), 2);
        assert_eq!(hs.get("A").entries()[0].name, "Ann");
        assert_eq!(hs.charts.len(), 2);
        assert!(hs.get("A").get(CHART_SIZE).is_none());
    }

    #[test]
    fn test_kv_round_trip() {
        let mut hs = Hiscores::new();
        hs.get("Original").add("Ann", 7, 123_456);
        hs.get("Tournament");
        let text = hs.to_kv().to_text();
        assert!(text.starts_with("chartnum=2\n"));
        let mut loaded = Hiscores::from_kv(&KvDoc::parse(&text));
        // The new-entry mark is not persisted
        for e in &mut hs.get("Original").entries {
            e.new_entry = false;
        }
        assert_eq!(loaded, hs);
        assert_eq!(loaded.get("Original").entries()[0].score, 123_456);
    }
}
