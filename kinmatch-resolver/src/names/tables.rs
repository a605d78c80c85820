//! Name reference data
//!
//! Nickname groups, cultural / immigration equivalents and spelling
//! substitution rules. The built-in tables cover common English, German,
//! French, Italian, Spanish, Dutch, Polish and Irish forms; callers with
//! better reference data build their own [`NameTables`].
//!
//! All entries are stored normalized (ASCII, lowercase).

use std::collections::{HashMap, HashSet};

/// Canonical given name → nicknames
const NICKNAMES: &[(&str, &[&str])] = &[
    ("abigail", &["abby", "nabby", "gail"]),
    ("albert", &["al", "bert", "bertie"]),
    ("alexander", &["alex", "alec", "sandy", "xander"]),
    ("anne", &["ann", "annie", "nancy", "nan", "nanny"]),
    ("anthony", &["tony"]),
    ("augustus", &["gus", "gussie"]),
    ("benjamin", &["ben", "benny", "benji"]),
    ("catherine", &["kate", "katie", "kathy", "cathy", "kitty", "kit"]),
    ("charles", &["charlie", "chas", "chuck", "carl"]),
    ("christopher", &["chris", "kit", "topher"]),
    ("daniel", &["dan", "danny"]),
    ("dorothy", &["dot", "dolly", "dottie"]),
    ("edward", &["ed", "eddie", "ned", "ted", "teddy"]),
    ("eleanor", &["ellie", "nell", "nellie", "nora"]),
    ("elizabeth", &["eliza", "liz", "lizzie", "beth", "betsy", "betty", "bess", "bessie", "libby", "lisa"]),
    ("ezekiel", &["zeke"]),
    ("frances", &["fanny", "fran", "frankie"]),
    ("francis", &["frank", "fran"]),
    ("frederick", &["fred", "freddie", "fritz"]),
    ("george", &["georgie"]),
    ("harriet", &["hattie", "hatty"]),
    ("helen", &["nell", "nellie", "lena"]),
    ("henry", &["harry", "hank", "hal"]),
    ("isaac", &["ike", "zac"]),
    ("jacob", &["jake", "jay"]),
    ("james", &["jim", "jimmy", "jamie", "jem"]),
    ("jeremiah", &["jerry", "jem"]),
    ("john", &["jack", "johnny", "jon", "jock"]),
    ("jonathan", &["jon", "jonny", "nathan"]),
    ("joseph", &["joe", "joey", "jos"]),
    ("katherine", &["kate", "katie", "kathy", "kay", "kitty"]),
    ("lawrence", &["larry", "laurie"]),
    ("louisa", &["lou", "lulu", "lois"]),
    ("margaret", &["maggie", "meg", "peggy", "marge", "madge", "daisy", "greta", "gretchen"]),
    ("martha", &["patsy", "mattie", "marty"]),
    ("mary", &["polly", "molly", "mae", "mamie", "mollie"]),
    ("matthew", &["matt", "matty"]),
    ("michael", &["mike", "mickey", "mick"]),
    ("nathaniel", &["nat", "nate", "natty"]),
    ("patricia", &["pat", "patty", "patsy", "trish"]),
    ("peter", &["pete"]),
    ("rebecca", &["becky", "becca", "reba"]),
    ("richard", &["dick", "rick", "rich", "richie", "dickie"]),
    ("robert", &["bob", "bobby", "rob", "robbie", "bert", "robin"]),
    ("samuel", &["sam", "sammy"]),
    ("sarah", &["sally", "sadie", "sara"]),
    ("susan", &["sue", "susie", "suzy"]),
    ("theodore", &["ted", "teddy", "theo"]),
    ("thomas", &["tom", "tommy", "thos"]),
    ("wilhelmina", &["minnie", "wilma", "mina"]),
    ("william", &["bill", "billy", "will", "willy", "willie", "liam", "wm"]),
    ("zachariah", &["zach", "zack", "zeke"]),
];

/// Equivalent forms across languages and immigration-era anglicization
const CULTURAL_GROUPS: &[&[&str]] = &[
    // Given names
    &["john", "johann", "johannes", "jan", "jean", "giovanni", "juan", "ivan", "sean", "hans", "janos"],
    &["william", "wilhelm", "guillaume", "guglielmo", "guillermo", "willem"],
    &["mary", "maria", "marie", "miriam", "maire", "marja"],
    &["joseph", "josef", "giuseppe", "jose", "jozef", "josep"],
    &["peter", "pierre", "pietro", "pedro", "piotr", "petr", "pieter"],
    &["henry", "heinrich", "henri", "enrico", "enrique", "hendrik"],
    &["charles", "karl", "carl", "carlo", "carlos", "karel"],
    &["george", "georg", "georges", "giorgio", "jorge", "jerzy"],
    &["james", "jacques", "giacomo", "diego", "jaime", "seamus"],
    &["catherine", "katharina", "katarina", "caterina", "katarzyna", "ekaterina", "catalina"],
    &["elizabeth", "elisabeth", "elisabetta", "isabel", "elzbieta", "elisabet"],
    &["margaret", "margarethe", "marguerite", "margherita", "margarita", "malgorzata"],
    &["michael", "michel", "michele", "miguel", "michal", "mikhail"],
    &["anne", "anna", "ana", "hannah"],
    &["francis", "franz", "francois", "francesco", "francisco", "franciszek"],
    &["stephen", "stefan", "etienne", "stefano", "esteban"],
    &["andrew", "andreas", "andre", "andrea", "andres", "andrzej"],
    &["thomas", "tomas", "tommaso", "tomasz"],
    &["louis", "ludwig", "luigi", "luis", "lodewijk"],
    &["frederick", "friedrich", "frederic", "federico"],
    // Family names
    &["smith", "schmidt", "schmitt", "smyth", "kowalski"],
    &["miller", "muller", "mueller", "moller"],
    &["snyder", "schneider", "snider"],
    &["carpenter", "zimmermann", "zimmerman"],
    &["baker", "becker", "backer"],
    &["cook", "koch"],
    &["fisher", "fischer"],
    &["weaver", "weber"],
    &["wagner", "waggoner", "wagoner"],
    &["brown", "braun", "brun"],
    &["black", "schwarz", "schwartz"],
    &["young", "jung"],
    &["long", "lang", "lange"],
    &["little", "klein", "kline"],
    &["taylor", "schneider", "sarto"],
];

/// Interchangeable spellings, applied as single substring substitutions
const SPELLING_RULES: &[(&str, &str)] = &[
    ("ph", "f"),
    ("ck", "k"),
    ("c", "k"),
    ("ie", "y"),
    ("ey", "y"),
    ("ei", "ie"),
    ("y", "i"),
    ("sch", "sh"),
    ("tz", "z"),
    ("th", "t"),
    ("mac", "mc"),
    ("son", "sen"),
    ("ou", "ow"),
    ("er", "or"),
    ("ll", "l"),
    ("nn", "n"),
    ("tt", "t"),
    ("ss", "s"),
    ("ff", "f"),
    ("mm", "m"),
    ("rr", "r"),
    ("ee", "ea"),
];

/// Pluggable reference tables for name variation
#[derive(Debug, Clone)]
pub struct NameTables {
    /// canonical → nicknames
    nicknames: HashMap<String, Vec<String>>,
    /// nickname → canonicals
    nickname_index: HashMap<String, Vec<String>>,
    cultural_groups: Vec<Vec<String>>,
    spelling_rules: Vec<(String, String)>,
}

impl Default for NameTables {
    fn default() -> Self {
        Self::new(
            NICKNAMES
                .iter()
                .map(|(canonical, nicks)| {
                    (
                        canonical.to_string(),
                        nicks.iter().map(|n| n.to_string()).collect::<Vec<String>>(),
                    )
                }),
            CULTURAL_GROUPS
                .iter()
                .map(|group| group.iter().map(|n| n.to_string()).collect::<Vec<String>>()),
            SPELLING_RULES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string())),
        )
    }
}

impl NameTables {
    /// Build tables from caller-supplied reference data
    ///
    /// # Arguments
    /// * `nicknames` - (canonical, nicknames) pairs
    /// * `cultural_groups` - groups of mutually equivalent names
    /// * `spelling_rules` - (from, to) substring substitutions, applied both ways
    pub fn new(
        nicknames: impl IntoIterator<Item = (String, Vec<String>)>,
        cultural_groups: impl IntoIterator<Item = Vec<String>>,
        spelling_rules: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut canonical_map: HashMap<String, Vec<String>> = HashMap::new();
        let mut index: HashMap<String, Vec<String>> = HashMap::new();

        for (canonical, nicks) in nicknames {
            let canonical = canonical.to_lowercase();
            for nick in nicks {
                let nick = nick.to_lowercase();
                index.entry(nick.clone()).or_default().push(canonical.clone());
                canonical_map.entry(canonical.clone()).or_default().push(nick);
            }
        }

        Self {
            nicknames: canonical_map,
            nickname_index: index,
            cultural_groups: cultural_groups
                .into_iter()
                .map(|g| g.into_iter().map(|n| n.to_lowercase()).collect())
                .collect(),
            spelling_rules: spelling_rules
                .into_iter()
                .filter(|(from, to)| from != to && !(from.is_empty() && to.is_empty()))
                .collect(),
        }
    }

    /// Tables with no entries; only edit distance and phonetics apply
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    /// True when one name is a nickname of the other, or both are
    /// nicknames of the same canonical name
    pub fn are_nicknames(&self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        let a_roots = self.roots(a);
        let b_roots = self.roots(b);
        a_roots.iter().any(|r| b_roots.contains(r))
    }

    /// Every nickname-related form of `name`, excluding `name` itself
    pub fn nickname_variants(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(name.to_string());
        for root in self.roots(name) {
            if seen.insert(root.clone()) {
                out.push(root.clone());
            }
            for nick in self.nicknames.get(&root).into_iter().flatten() {
                if seen.insert(nick.clone()) {
                    out.push(nick.clone());
                }
            }
        }
        out
    }

    /// True when both names appear in the same cultural group
    pub fn are_cultural_variants(&self, a: &str, b: &str) -> bool {
        a != b
            && self
                .cultural_groups
                .iter()
                .any(|g| g.iter().any(|n| n == a) && g.iter().any(|n| n == b))
    }

    /// Every cultural equivalent of `name`, excluding `name` itself
    pub fn cultural_variants(&self, name: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for group in self.cultural_groups.iter().filter(|g| g.iter().any(|n| n == name)) {
            for member in group {
                if member != name && !out.contains(member) {
                    out.push(member.clone());
                }
            }
        }
        out
    }

    /// True when a single substitution rule maps one spelling onto the other
    pub fn are_spelling_variants(&self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        self.spelling_rules.iter().any(|(from, to)| {
            let forward = |s: &str| substitute(s, from, to);
            let backward = |s: &str| substitute(s, to, from);
            forward(a).as_deref() == Some(b)
                || forward(b).as_deref() == Some(a)
                || backward(a).as_deref() == Some(b)
                || backward(b).as_deref() == Some(a)
                || matches!((forward(a), forward(b)), (Some(x), Some(y)) if x == y)
        })
    }

    /// Single-rule respellings of `name`
    pub fn spelling_variants(&self, name: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for (from, to) in &self.spelling_rules {
            for candidate in [substitute(name, from, to), substitute(name, to, from)]
                .into_iter()
                .flatten()
            {
                if candidate != name && !candidate.is_empty() && !out.contains(&candidate) {
                    out.push(candidate);
                }
            }
        }
        out
    }

    /// Canonical names `name` belongs to (itself when canonical)
    fn roots(&self, name: &str) -> Vec<String> {
        let mut roots = Vec::new();
        if self.nicknames.contains_key(name) {
            roots.push(name.to_string());
        }
        if let Some(canonicals) = self.nickname_index.get(name) {
            for c in canonicals {
                if !roots.contains(c) {
                    roots.push(c.clone());
                }
            }
        }
        roots
    }
}

/// `text` with every occurrence of `from` replaced, or None when `from`
/// does not occur
fn substitute(text: &str, from: &str, to: &str) -> Option<String> {
    if from.is_empty() || !text.contains(from) {
        return None;
    }
    Some(text.replace(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_lookup_is_bidirectional() {
        let tables = NameTables::default();
        assert!(tables.are_nicknames("william", "bill"));
        assert!(tables.are_nicknames("bill", "william"));
        // Siblings under the same canonical name
        assert!(tables.are_nicknames("bill", "will"));
        assert!(!tables.are_nicknames("bill", "robert"));
    }

    #[test]
    fn test_nickname_variants() {
        let tables = NameTables::default();
        let variants = tables.nickname_variants("bob");
        assert!(variants.contains(&"robert".to_string()));
        assert!(variants.contains(&"bobby".to_string()));
        assert!(!variants.contains(&"bob".to_string()));
    }

    #[test]
    fn test_cultural_variants() {
        let tables = NameTables::default();
        assert!(tables.are_cultural_variants("johann", "john"));
        assert!(tables.are_cultural_variants("schmidt", "smith"));
        assert!(!tables.are_cultural_variants("john", "john"));
        assert!(tables.cultural_variants("giuseppe").contains(&"joseph".to_string()));
    }

    #[test]
    fn test_spelling_variants() {
        let tables = NameTables::default();
        assert!(tables.are_spelling_variants("smyth", "smith"));
        assert!(tables.are_spelling_variants("catherine", "katherine"));
        assert!(tables.are_spelling_variants("philips", "filips"));
        assert!(tables.are_spelling_variants("macdonald", "mcdonald"));
        assert!(!tables.are_spelling_variants("smith", "jones"));
    }

    #[test]
    fn test_empty_tables_match_nothing() {
        let tables = NameTables::empty();
        assert!(!tables.are_nicknames("william", "bill"));
        assert!(tables.spelling_variants("smith").is_empty());
    }

    #[test]
    fn test_custom_tables() {
        let tables = NameTables::new(
            vec![("ignatius".to_string(), vec!["iggy".to_string()])],
            vec![vec!["ignatius".to_string(), "ignacy".to_string()]],
            Vec::new(),
        );
        assert!(tables.are_nicknames("iggy", "ignatius"));
        assert!(tables.are_cultural_variants("ignacy", "ignatius"));
    }
}
