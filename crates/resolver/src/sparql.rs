//! Client for the open data SPARQL endpoint.

use crate::Result;
use oumodules_protocol::{Code, ModuleResult};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

const XCRI_QUERY: &str = r#"
PREFIX xcri: <http://xcri.org/profiles/catalog/1.2/>
PREFIX dc: <http://purl.org/dc/elements/1.1/>
PREFIX mlo: <http://purl.org/net/mlo/>
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?id ?title ?url ?type
FROM <http://data.open.ac.uk/context/xcri> WHERE {
  ?course a xcri:course .
  ?course xcri:internalID ?id .
  ?course dc:title ?title .
  ?course mlo:url ?url .
  ?course rdf:type ?type
  FILTER ( STRSTARTS ( STR ( ?type ), "http://data.open.ac.uk/ontology/" ) )
  {filter}
}
"#;

const OLDCOURSES_QUERY: &str = r#"
PREFIX aiiso: <http://purl.org/vocab/aiiso/schema#>
PREFIX dcterms: <http://purl.org/dc/terms/>

SELECT ?id ?title
FROM <http://data.open.ac.uk/context/oldcourses> WHERE {
  ?course a aiiso:Module .
  ?course aiiso:code ?id .
  ?course dcterms:title ?title
  {filter}
}
"#;

/// The two course catalogues published by the data service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseDataset {
    /// Current courses, with page urls.
    Xcri,
    /// Discontinued modules, titles only.
    OldCourses,
}

impl CourseDataset {
    pub fn name(self) -> &'static str {
        match self {
            Self::Xcri => "xcri",
            Self::OldCourses => "oldcourses",
        }
    }

    pub fn query(self, filter: &str) -> String {
        let template = match self {
            Self::Xcri => XCRI_QUERY,
            Self::OldCourses => OLDCOURSES_QUERY,
        };
        template.replace("{filter}", filter)
    }
}

/// Exact-match filter on the `?id` variable.
pub fn exact_code_filter(code: &Code) -> String {
    format!(r#"FILTER(?id = "{}")"#, code.as_str())
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

pub type Binding = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct SparqlClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl SparqlClient {
    pub fn new(client: Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Run `query` and flatten each binding to `variable -> value`.
    pub async fn select(&self, query: &str, offset: usize, limit: usize) -> Result<Vec<Binding>> {
        let paged = format!("{query} offset {offset} limit {limit}");
        let response: SparqlResponse = self
            .client
            .get(&self.endpoint)
            .query(&[("query", paged.as_str())])
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response
            .results
            .bindings
            .into_iter()
            .map(|binding| {
                binding
                    .into_iter()
                    .map(|(key, value)| (key, value.value))
                    .collect()
            })
            .collect())
    }

    pub async fn find_in(
        &self,
        dataset: CourseDataset,
        code: &Code,
    ) -> Result<Option<ModuleResult>> {
        let query = dataset.query(&exact_code_filter(code));
        let mut rows = self.select(&query, 0, 1).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        let mut row = rows.swap_remove(0);
        let Some(title) = row.remove("title") else {
            log::warn!("{} binding for {code} has no title", dataset.name());
            return Ok(None);
        };
        log::info!("{code} found in {}", dataset.name());
        Ok(Some(ModuleResult::new(code.clone(), title, row.remove("url"))))
    }

    /// Current catalogue first, then the legacy one.
    pub async fn find_module_or_qualification(&self, code: &Code) -> Result<Option<ModuleResult>> {
        for dataset in [CourseDataset::Xcri, CourseDataset::OldCourses] {
            log::debug!("querying {code} from {}", dataset.name());
            if let Some(found) = self.find_in(dataset, code).await? {
                return Ok(Some(found));
            }
        }
        log::info!("{code} not in SPARQL results");
        Ok(None)
    }
}
