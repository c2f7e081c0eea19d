use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, sync::Arc};

/// A searchable entry. Only `description` is embedded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorpusItem {
    pub id: u64,
    pub title: String,
    pub description: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("unsupported corpus format {0:?}, expected .csv, .yaml or .yml")]
    UnsupportedFormat(String),

    #[error("corpus is empty")]
    Empty,

    #[error("duplicate corpus item id {0}")]
    DuplicateId(u64),
}

/// Read-only list of items searched by every request.
///
/// Cloning is cheap and all clones share the same items.
#[derive(Debug, Clone)]
pub struct Corpus {
    items: Arc<[CorpusItem]>,
}

impl Corpus {
    pub fn new(items: Vec<CorpusItem>) -> Result<Self, CorpusError> {
        if items.is_empty() {
            return Err(CorpusError::Empty);
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id) {
                return Err(CorpusError::DuplicateId(item.id));
            }
        }

        Ok(Self {
            items: items.into(),
        })
    }

    /// Load a corpus from a `.csv` file with `id,title,description` headers
    /// or from a `.yaml`/`.yml` list of items.
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let items = match extension.as_str() {
            "csv" => {
                let mut csv_reader = csv::Reader::from_path(path)?;
                csv_reader
                    .deserialize::<CorpusItem>()
                    .collect::<Result<Vec<_>, _>>()?
            }
            "yaml" | "yml" => {
                let data = std::fs::read_to_string(path)?;
                serde_yml::from_str::<Vec<CorpusItem>>(&data)?
            }
            _ => return Err(CorpusError::UnsupportedFormat(extension)),
        };

        let corpus = Self::new(items)?;
        log::info!("loaded {} corpus items from {}", corpus.len(), path.display());
        Ok(corpus)
    }

    /// The demo movie list served when no corpus file is configured.
    pub fn builtin() -> Self {
        let items = BUILTIN_MOVIES
            .iter()
            .zip(1u64..)
            .map(|((title, description), id)| CorpusItem {
                id,
                title: title.to_string(),
                description: description.to_string(),
            })
            .collect::<Vec<_>>();

        Self {
            items: items.into(),
        }
    }

    pub fn items(&self) -> &[CorpusItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Texts to embed, in corpus order.
    pub fn descriptions(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| item.description.clone())
            .collect()
    }
}

const BUILTIN_MOVIES: &[(&str, &str)] = &[
    (
        "The Matrix",
        "A hacker learns that reality is a simulation run by machines and joins a rebellion to free humanity.",
    ),
    (
        "Inception",
        "A thief who steals secrets through shared dreams is hired to plant an idea deep in a target's subconscious.",
    ),
    (
        "Finding Nemo",
        "An anxious clownfish crosses the ocean to rescue his son, who was taken to a dentist's aquarium.",
    ),
    (
        "The Shawshank Redemption",
        "A banker sentenced to life in prison befriends a fellow inmate and quietly plans his escape over two decades.",
    ),
    (
        "Jurassic Park",
        "Cloned dinosaurs break loose in an island theme park and hunt the scientists visiting it.",
    ),
    (
        "Toy Story",
        "A cowboy doll feels threatened when a flashy space ranger action figure becomes his owner's favorite toy.",
    ),
    (
        "Interstellar",
        "Astronauts travel through a wormhole near Saturn searching for a new home as Earth becomes uninhabitable.",
    ),
    (
        "The Godfather",
        "The aging head of a crime family hands control of his empire to his reluctant youngest son.",
    ),
    (
        "Spirited Away",
        "A young girl trapped in a world of spirits works in a bathhouse to free her parents, who were turned into pigs.",
    ),
    (
        "Alien",
        "The crew of a commercial spaceship is stalked by a deadly creature after answering a distress signal.",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, title: &str, description: &str) -> CorpusItem {
        CorpusItem {
            id,
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_builtin_corpus() {
        let corpus = Corpus::builtin();
        assert_eq!(corpus.len(), BUILTIN_MOVIES.len());
        assert_eq!(corpus.items()[0].id, 1);
        assert_eq!(corpus.items()[0].title, "The Matrix");

        // builtin ids must be unique too
        assert!(Corpus::new(corpus.items().to_vec()).is_ok());
    }

    #[test]
    fn test_descriptions_in_corpus_order() {
        let corpus = Corpus::new(vec![item(2, "b", "second"), item(1, "a", "first")]).unwrap();
        assert_eq!(corpus.descriptions(), vec!["second", "first"]);
    }

    #[test]
    fn test_rejects_empty_corpus() {
        assert!(matches!(Corpus::new(vec![]), Err(CorpusError::Empty)));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let result = Corpus::new(vec![item(1, "a", "x"), item(1, "b", "y")]);
        assert!(matches!(result, Err(CorpusError::DuplicateId(1))));
    }

    #[test]
    fn test_clones_share_items() {
        let corpus = Corpus::builtin();
        let clone = corpus.clone();
        assert!(std::ptr::eq(corpus.items(), clone.items()));
    }

    #[test]
    fn test_load_csv() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("movies.csv");
        std::fs::write(
            &path,
            "id,title,description\n10,Heat,\"A detective hunts a crew of professional thieves, in Los Angeles.\"\n11,Up,An old man ties balloons to his house.\n",
        )
        .unwrap();

        let corpus = Corpus::load(&path).unwrap();
        assert_eq!(
            corpus.items(),
            &[
                item(
                    10,
                    "Heat",
                    "A detective hunts a crew of professional thieves, in Los Angeles."
                ),
                item(11, "Up", "An old man ties balloons to his house."),
            ]
        );
    }

    #[test]
    fn test_load_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("movies.yml");
        std::fs::write(
            &path,
            "- id: 1\n  title: Heat\n  description: heist thriller\n- id: 2\n  title: Up\n  description: balloon adventure\n",
        )
        .unwrap();

        let corpus = Corpus::load(&path).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.items()[1], item(2, "Up", "balloon adventure"));
    }

    #[test]
    fn test_load_unsupported_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("movies.txt");
        std::fs::write(&path, "whatever").unwrap();

        assert!(matches!(
            Corpus::load(&path),
            Err(CorpusError::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }

    #[test]
    fn test_load_malformed_csv() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("movies.csv");
        std::fs::write(&path, "id,title,description\nnot-a-number,Heat,heist\n").unwrap();

        assert!(matches!(Corpus::load(&path), Err(CorpusError::Csv(_))));
    }
}
