//! Word index over page content for the client-side search box
use crate::codec::{self, MarkupCodec};
use crate::links::LinkResolver;
use crate::tree::{PageId, Tree};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

static COMMENT_RE: OnceLock<Regex> = OnceLock::new();
static TAG_RE: OnceLock<Regex> = OnceLock::new();
static MARKER_RE: OnceLock<Regex> = OnceLock::new();
static WIKILINK_RE: OnceLock<Regex> = OnceLock::new();
static ANNOTATION_RE: OnceLock<Regex> = OnceLock::new();
static SENTENCE_RE: OnceLock<Regex> = OnceLock::new();
static PUNCTUATION_RE: OnceLock<Regex> = OnceLock::new();

fn comment_regex() -> &'static Regex {
    COMMENT_RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").unwrap())
}

fn tag_regex() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn marker_regex() -> &'static Regex {
    MARKER_RE.get_or_init(|| Regex::new(r"\[/?[0-9a-z]\]").unwrap())
}

fn wikilink_regex() -> &'static Regex {
    WIKILINK_RE.get_or_init(|| Regex::new(r"\[\[(?:[^\]|]*\|)?([^\]]*)\]\]").unwrap())
}

fn annotation_regex() -> &'static Regex {
    ANNOTATION_RE.get_or_init(|| Regex::new(r"(?s)\{[^}]*\}").unwrap())
}

fn sentence_regex() -> &'static Regex {
    SENTENCE_RE.get_or_init(|| Regex::new(r"[.!?;:]+").unwrap())
}

fn punctuation_regex() -> &'static Regex {
    PUNCTUATION_RE.get_or_init(|| Regex::new(r#"[,"“”«»()|\[\]]"#).unwrap())
}

/// Normalised lines of one page and the lines each word appears on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAnalysis {
    pub lines: Vec<String>,
    pub words: BTreeMap<String, Vec<usize>>,
}

/// Site-wide index document consumed by the search client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// word → page number → global line indices
    pub terms: BTreeMap<String, BTreeMap<usize, Vec<usize>>>,
    pub sentences: Vec<String>,
    pub urls: Vec<String>,
    pub names: Vec<String>,
}

/// A page matching a looked-up word
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    pub url: String,
    pub sentences: Vec<String>,
}

impl Analysis {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Pages containing `word`, in traversal order
    pub fn lookup(&self, word: &str) -> Vec<SearchHit> {
        let Some(pages) = self.terms.get(&word.to_lowercase()) else {
            return Vec::new();
        };
        pages
            .iter()
            .filter_map(|(&page, lines)| {
                Some(SearchHit {
                    name: self.names.get(page)?.clone(),
                    url: self.urls.get(page)?.clone(),
                    sentences: lines
                        .iter()
                        .filter_map(|&l| self.sentences.get(l).cloned())
                        .collect(),
                })
            })
            .collect()
    }
}

pub struct SearchIndexer<'a> {
    tree: &'a Tree,
    codec: &'a MarkupCodec,
    dropped: Vec<Regex>,
}

impl<'a> SearchIndexer<'a> {
    /// `dropped_spans` names tags whose whole contents are left out
    pub fn new(tree: &'a Tree, codec: &'a MarkupCodec, dropped_spans: &[String]) -> Self {
        let dropped = dropped_spans
            .iter()
            .filter_map(|tag| {
                let pattern = format!(r"(?s)<{0}\b[^>]*>.*?</{0}>", regex::escape(tag));
                match Regex::new(&pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        tracing::warn!("Invalid dropped span '{}': {}", tag, e);
                        None
                    }
                }
            })
            .collect();

        Self {
            tree,
            codec,
            dropped,
        }
    }

    /// Reduce content to lowercase plain-text lines, one per sentence
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let mut text = codec::strip_datestamp(text).to_string();
        for re in &self.dropped {
            text = re.replace_all(&text, "").into_owned();
        }
        let text = comment_regex().replace_all(&text, "");
        let text = wikilink_regex().replace_all(&text, "$1");
        let text = marker_regex().replace_all(&text, "");
        let text = tag_regex().replace_all(&text, "");
        let text = annotation_regex().replace_all(&text, "");
        let text = sentence_regex().replace_all(&text, "\n");
        let text = punctuation_regex().replace_all(&text, " ");

        let collapsed: Vec<String> = text
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect();

        self.codec
            .to_markdown(&collapsed.join("\n"))
            .to_lowercase()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn analyze_text(&self, text: &str) -> PageAnalysis {
        let lines = self.normalize(text);
        let mut words: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, line) in lines.iter().enumerate() {
            for word in line.split_whitespace() {
                let entry = words.entry(word.to_string()).or_default();
                if entry.last() != Some(&index) {
                    entry.push(index);
                }
            }
        }
        PageAnalysis { lines, words }
    }

    pub fn analyze_page(&self, id: PageId) -> PageAnalysis {
        self.analyze_text(self.tree.content(id))
    }

    /// Index every page in traversal order with global line offsets
    pub fn analyze(&self) -> Analysis {
        let links = LinkResolver::new(self.tree);
        let mut analysis = Analysis::default();

        for (page, id) in self.tree.traverse().enumerate() {
            let offset = analysis.sentences.len();
            let PageAnalysis { lines, words } = self.analyze_page(id);

            for (word, indices) in words {
                analysis
                    .terms
                    .entry(word)
                    .or_default()
                    .insert(page, indices.into_iter().map(|i| i + offset).collect());
            }
            analysis.sentences.extend(lines);
            analysis.urls.push(links.output_path(id));
            analysis.names.push(self.tree.name(id).to_string());
        }

        tracing::debug!(
            "Indexed {} words across {} pages",
            analysis.terms.len(),
            analysis.names.len()
        );
        analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dropped() -> Vec<String> {
        vec!["ipa".to_string()]
    }

    #[test]
    fn test_word_lines_not_duplicated() {
        let tree = Tree::new("Root", 1).unwrap();
        let codec = MarkupCodec::default();
        let indexer = SearchIndexer::new(&tree, &codec, &dropped());

        let page = indexer.analyze_text("The cat sat. The dog ran.");
        assert_eq!(page.lines, vec!["the cat sat", "the dog ran"]);
        assert_eq!(page.words["the"], vec![0, 1]);

        let repeated = indexer.analyze_text("the the cat");
        assert_eq!(repeated.words["the"], vec![0]);
    }

    #[test]
    fn test_normalize_strips_markup() {
        let tree = Tree::new("Root", 1).unwrap();
        let codec = MarkupCodec::parse("[b] <strong>\n[/b] </strong>\n").unwrap();
        let indexer = SearchIndexer::new(&tree, &codec, &dropped());

        let lines = indexer.normalize(
            "[e]Pata <ipa>ˈpa.ta</ipa> means {archaic} [b]bread[/b], see [[ka|grain]]!\n\
             <!-- draft -->Second line\n&date=20240309",
        );
        assert_eq!(lines, vec!["pata means bread see grain", "second line"]);
    }

    #[test]
    fn test_site_analysis_uses_global_offsets() {
        let source = "[1]Dictionary\nA dictionary.\n[2]ka\nKa is grain. Ka is food.\n[2]pata\nPata is bread.\n";
        let tree = Tree::parse(source, 1).unwrap().tree;
        let codec = MarkupCodec::default();
        let analysis = SearchIndexer::new(&tree, &codec, &dropped()).analyze();

        assert_eq!(
            analysis.sentences,
            vec!["a dictionary", "ka is grain", "ka is food", "pata is bread"]
        );
        assert_eq!(analysis.urls, vec!["index.html", "ka.html", "pata.html"]);
        assert_eq!(analysis.names, vec!["Dictionary", "ka", "pata"]);
        assert_eq!(analysis.terms["is"][&1], vec![1, 2]);
        assert_eq!(analysis.terms["is"][&2], vec![3]);
        assert!(!analysis.terms["is"].contains_key(&0));

        let hits = analysis.lookup("Ka");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "ka.html");
        assert_eq!(hits[0].sentences, vec!["ka is grain", "ka is food"]);
    }

    #[test]
    fn test_json_round_trip() {
        let tree = Tree::parse("[1]Root\nWords here.\n", 1).unwrap().tree;
        let codec = MarkupCodec::default();
        let analysis = SearchIndexer::new(&tree, &codec, &[]).analyze();

        let json = analysis.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["terms"]["words"]["0"], serde_json::json!([0]));
        assert_eq!(Analysis::from_json(&json).unwrap(), analysis);
    }
}
