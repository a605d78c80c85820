//! Historical place validity windows
//!
//! Flags place names used outside the years they existed under that name,
//! e.g. "Yugoslavia" for an 1850 birth or "West Virginia" before 1863.
//! Violations are advisory; they never make a record invalid.

use deunicode::deunicode;

/// Years during which a place name was in use (inclusive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceWindow {
    /// Normalized name matched as a whole word sequence
    pub name: String,
    pub from: Option<i32>,
    pub until: Option<i32>,
}

impl PlaceWindow {
    pub fn new(name: &str, from: Option<i32>, until: Option<i32>) -> Self {
        Self {
            name: normalize_place(name),
            from,
            until,
        }
    }

    fn describe(&self) -> String {
        match (self.from, self.until) {
            (Some(f), Some(u)) => format!("{}-{}", f, u),
            (Some(f), None) => format!("from {}", f),
            (None, Some(u)) => format!("until {}", u),
            (None, None) => "always".to_string(),
        }
    }
}

const BUILT_IN: &[(&str, Option<i32>, Option<i32>)] = &[
    ("west virginia", Some(1863), None),
    ("oklahoma", Some(1889), None),
    ("arizona", Some(1863), None),
    ("nevada", Some(1861), None),
    ("colorado", Some(1861), None),
    ("idaho", Some(1863), None),
    ("montana", Some(1864), None),
    ("wyoming", Some(1868), None),
    ("north dakota", Some(1889), None),
    ("south dakota", Some(1889), None),
    ("kansas", Some(1854), None),
    ("nebraska", Some(1854), None),
    ("minnesota", Some(1849), None),
    ("wisconsin", Some(1836), None),
    ("iowa", Some(1838), None),
    ("maine", Some(1820), None),
    ("new amsterdam", None, Some(1664)),
    ("yugoslavia", Some(1918), Some(1992)),
    ("czechoslovakia", Some(1918), Some(1992)),
    ("soviet union", Some(1922), Some(1991)),
    ("ussr", Some(1922), Some(1991)),
    ("east germany", Some(1949), Some(1990)),
    ("west germany", Some(1949), Some(1990)),
    ("prussia", None, Some(1947)),
    ("austria-hungary", Some(1867), Some(1918)),
    ("ottoman empire", None, Some(1922)),
    ("persia", None, Some(1935)),
    ("ceylon", None, Some(1972)),
    ("rhodesia", Some(1895), Some(1979)),
    ("zimbabwe", Some(1980), None),
    ("israel", Some(1948), None),
    ("pakistan", Some(1947), None),
    ("bangladesh", Some(1971), None),
    ("petrograd", Some(1914), Some(1924)),
    ("leningrad", Some(1924), Some(1991)),
    ("constantinople", None, Some(1930)),
];

/// Pluggable table of place validity windows
#[derive(Debug, Clone)]
pub struct HistoricalPlaces {
    windows: Vec<PlaceWindow>,
}

impl Default for HistoricalPlaces {
    fn default() -> Self {
        Self {
            windows: BUILT_IN
                .iter()
                .map(|(name, from, until)| PlaceWindow::new(name, *from, *until))
                .collect(),
        }
    }
}

impl HistoricalPlaces {
    pub fn new(windows: Vec<PlaceWindow>) -> Self {
        Self { windows }
    }

    /// Warnings for every place-name component used outside its window
    pub fn check(&self, place: &str, year: i32) -> Vec<String> {
        let normalized = format!(" {} ", normalize_place(place));
        self.windows
            .iter()
            .filter(|w| normalized.contains(&format!(" {} ", w.name)))
            .filter(|w| w.from.is_some_and(|f| year < f) || w.until.is_some_and(|u| year > u))
            .map(|w| {
                format!(
                    "Place '{}' used for {} but the name was valid {}",
                    place.trim(),
                    year,
                    w.describe()
                )
            })
            .collect()
    }
}

fn normalize_place(place: &str) -> String {
    deunicode(place)
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anachronistic_place_flagged() {
        let places = HistoricalPlaces::default();
        let warnings = places.check("Belgrade, Yugoslavia", 1850);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("1918-1992"));
    }

    #[test]
    fn test_place_within_window_passes() {
        let places = HistoricalPlaces::default();
        assert!(places.check("Charleston, West Virginia", 1900).is_empty());
        assert!(places.check("Belgrade, Yugoslavia", 1950).is_empty());
    }

    #[test]
    fn test_whole_word_matching() {
        let places = HistoricalPlaces::default();
        // "Virginia" alone is not "West Virginia"
        assert!(places.check("Richmond, Virginia", 1800).is_empty());
        assert_eq!(places.check("Wheeling, West Virginia", 1850).len(), 1);
    }

    #[test]
    fn test_custom_table() {
        let places = HistoricalPlaces::new(vec![PlaceWindow::new("Gotham", Some(1900), None)]);
        assert_eq!(places.check("gotham", 1899).len(), 1);
        assert!(places.check("Yugoslavia", 1850).is_empty());
    }
}
