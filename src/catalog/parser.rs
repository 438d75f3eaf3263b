use std::collections::HashMap;

use sgp4::Elements;

use crate::catalog::error::CatalogError;

/// One named TLE record.
#[derive(Debug, Clone)]
pub struct OrbitalElementSet {
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub elements: Elements,
}

impl OrbitalElementSet {
    pub fn from_lines(name: Option<&str>, line1: &str, line2: &str) -> Result<Self, CatalogError> {
        let elements = Elements::from_tle(
            name.map(String::from),
            line1.as_bytes(),
            line2.as_bytes(),
        )
        .map_err(|e| CatalogError::InvalidTle {
            name: name.unwrap_or("<unnamed>").to_string(),
            message: e.to_string(),
        })?;

        let name = name
            .map(String::from)
            .unwrap_or_else(|| format!("NORAD {}", elements.norad_id));

        Ok(Self {
            name,
            line1: line1.to_string(),
            line2: line2.to_string(),
            elements,
        })
    }

    pub fn norad_id(&self) -> u64 {
        self.elements.norad_id
    }
}

/// Name to record mapping built from one TLE text resource.
#[derive(Debug, Clone, Default)]
pub struct ElementCatalog {
    sets: HashMap<String, OrbitalElementSet>,
}

impl ElementCatalog {
    pub fn get(&self, name: &str) -> Option<&OrbitalElementSet> {
        self.sets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Later records with the same name replace earlier ones.
    pub fn insert(&mut self, set: OrbitalElementSet) {
        if let Some(previous) = self.sets.insert(set.name.clone(), set) {
            log::debug!("Replaced duplicate TLE record for {}", previous.name);
        }
    }
}

/// Partial catalog plus everything that had to be skipped to build it.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub catalog: ElementCatalog,
    pub issues: Vec<CatalogError>,
}

/// Parse multi-satellite TLE content. Never fails as a whole: unusable lines
/// and records end up in `issues`.
pub fn parse_catalog(content: &str) -> ParseOutcome {
    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .collect();

    let mut outcome = ParseOutcome::default();
    let mut i = 0;

    while i < lines.len() {
        let (line_no, line) = lines[i];

        let record = if is_line1(line) && i + 1 < lines.len() && is_line2(lines[i + 1].1) {
            // 2-line TLE (no name)
            let parsed = OrbitalElementSet::from_lines(None, line, lines[i + 1].1);
            i += 2;
            parsed
        } else if i + 2 < lines.len() && is_line1(lines[i + 1].1) && is_line2(lines[i + 2].1) {
            let parsed = OrbitalElementSet::from_lines(Some(line), lines[i + 1].1, lines[i + 2].1);
            i += 3;
            parsed
        } else {
            outcome.issues.push(CatalogError::Parse {
                line: line_no,
                message: format!("line does not start a TLE record: {:?}", line),
            });
            i += 1;
            continue;
        };

        match record {
            Ok(set) => outcome.catalog.insert(set),
            Err(e) => outcome.issues.push(e),
        }
    }

    for issue in &outcome.issues {
        log::warn!("Skipped TLE input: {}", issue);
    }

    outcome
}

fn is_line1(line: &str) -> bool {
    line.starts_with("1 ")
}

fn is_line2(line: &str) -> bool {
    line.starts_with("2 ")
}
