//! rdfquery CLI: run triple-pattern queries against a SPARQL endpoint or a
//! local N-Triples file
//!
//! Backends are chosen with `--config`, `--endpoint`, or `--data`.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use rdfquery::adapter::{Backend, BackendConfig, LocalConfig, ResultFormat, SparqlConfig, SparqlEngine};
use rdfquery::rdf::{Literal, NamedNode, Node, ResultRow, Term, Variable};
use rdfquery::{QueryModel, QueryOutput, Suggestion};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rdfquery", version, about = "Triple-pattern queries over RDF backends")]
struct Cli {
    /// YAML backend configuration
    #[arg(long, global = true, env = "RDFQUERY_CONFIG")]
    config: Option<PathBuf>,

    /// SPARQL endpoint URL
    #[arg(long, global = true, env = "RDFQUERY_ENDPOINT", conflicts_with = "config")]
    endpoint: Option<String>,

    /// Result encoding requested from the endpoint
    #[arg(long, global = true, default_value = "json")]
    results: ResultFormat,

    /// SPARQL server implementation
    #[arg(long, global = true, default_value = "sesame2")]
    engine: SparqlEngine,

    /// N-Triples file served by the embedded store
    #[arg(long, global = true, conflicts_with_all = ["config", "endpoint"])]
    data: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a raw query string in the backend's language
    Query {
        /// SPARQL or native dialect query
        query: String,
    },
    /// Find subjects matching predicate/object conditions
    Find {
        /// Condition as PREDICATE=OBJECT; objects in <...> or containing :// are IRIs
        #[arg(long = "where", required = true)]
        conditions: Vec<String>,

        /// Match literal objects by keyword
        #[arg(long)]
        keyword: bool,

        /// Print the number of distinct subjects only
        #[arg(long)]
        count: bool,

        /// Ask for distinct rows
        #[arg(long)]
        distinct: bool,

        /// Print the generated query instead of running it
        #[arg(long)]
        explain: bool,
    },
    /// Suggest predicates a resource is missing (local data only)
    Suggest {
        /// Resource IRI
        resource: String,

        /// Show at most this many suggestions
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let backend = Backend::from_config(backend_config(&cli)?)?;

    match cli.command {
        Commands::Query { ref query } => run_query(&backend, query, &cli.format).await,
        Commands::Find {
            ref conditions,
            keyword,
            count,
            distinct,
            explain,
        } => {
            let model = build_find(conditions, keyword, count, distinct)?;
            if explain {
                println!("{}", model.generate(backend.query_language())?);
                return Ok(());
            }
            run_find(&backend, model, &cli.format).await
        }
        Commands::Suggest { ref resource, limit } => {
            run_suggest(&backend, resource, limit, &cli.format).await
        }
    }
}

fn backend_config(cli: &Cli) -> anyhow::Result<BackendConfig> {
    if let Some(path) = &cli.config {
        return BackendConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()));
    }
    if let Some(url) = &cli.endpoint {
        return Ok(BackendConfig::Sparql(
            SparqlConfig::new(url.clone())
                .with_format(cli.results)
                .with_engine(cli.engine),
        ));
    }
    if let Some(data) = &cli.data {
        return Ok(BackendConfig::Local(LocalConfig {
            data: Some(data.clone()),
        }));
    }
    bail!("no backend given; use --config, --endpoint, or --data")
}

fn build_find(
    conditions: &[String],
    keyword: bool,
    count: bool,
    distinct: bool,
) -> anyhow::Result<QueryModel> {
    let s = Variable::new("s")?;
    let mut model = QueryModel::new();
    if count {
        model.add_counting_variable(s.clone())?;
    } else {
        model.add_binding_variables([s.clone()]);
    }
    for condition in conditions {
        let (predicate, object) = condition
            .split_once('=')
            .ok_or_else(|| anyhow!("condition {condition:?} is not PREDICATE=OBJECT"))?;
        model.add_condition(s.clone(), parse_iri(predicate)?, parse_object(object)?);
    }
    if keyword {
        model.activate_keyword_search();
    }
    if distinct {
        model.set_distinct();
    }
    Ok(model)
}

fn parse_iri(text: &str) -> anyhow::Result<NamedNode> {
    let text = text.trim();
    let iri = text
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(text);
    NamedNode::new(iri).with_context(|| format!("invalid IRI {text:?}"))
}

fn parse_object(text: &str) -> anyhow::Result<Term> {
    let text = text.trim();
    if text.starts_with('<') || text.contains("://") {
        return Ok(Term::Resource(parse_iri(text)?));
    }
    Ok(Term::Literal(Literal::new_simple_literal(text)))
}

async fn run_query(backend: &Backend, query: &str, format: &OutputFormat) -> anyhow::Result<()> {
    let rows = backend.query(query).await?;
    let width = rows.iter().map(ResultRow::len).max().unwrap_or(0);
    let columns: Vec<String> = (1..=width).map(|i| format!("?{i}")).collect();
    print_rows(&columns, &rows, format)
}

async fn run_find(backend: &Backend, model: QueryModel, format: &OutputFormat) -> anyhow::Result<()> {
    match model.execute(backend).await? {
        QueryOutput::Count(n) => match format {
            OutputFormat::Json => println!("{}", serde_json::json!({ "count": n })),
            _ => println!("{}", n),
        },
        QueryOutput::Rows(rows) => print_rows(&["s".to_string()], &rows, format)?,
    }
    Ok(())
}

async fn run_suggest(
    backend: &Backend,
    resource: &str,
    limit: usize,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let Backend::Local(adapter) = backend else {
        bail!("suggestions need local data; use --data");
    };
    let resource = parse_iri(resource)?;
    let mut suggestions: Vec<Suggestion> = adapter.suggest(&resource).await;
    suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
    suggestions.truncate(limit);

    match format {
        OutputFormat::Json => {
            let items: Vec<serde_json::Value> = suggestions
                .iter()
                .map(|s| serde_json::json!({ "predicate": s.predicate.as_str(), "score": s.score }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Csv => {
            println!("predicate,score");
            for s in &suggestions {
                println!("{},{:.4}", csv_escape(s.predicate.as_str()), s.score);
            }
        }
        OutputFormat::Table => {
            if suggestions.is_empty() {
                println!("(no suggestions)");
                return Ok(());
            }
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["predicate", "score"]);
            for s in &suggestions {
                table.add_row(vec![s.predicate.as_str().to_string(), format!("{:.4}", s.score)]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}

fn print_rows(columns: &[String], rows: &[ResultRow], format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let items: Vec<serde_json::Value> = rows
                .iter()
                .map(|row| row.iter().map(json_value).collect())
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Csv => {
            println!("{}", columns.join(","));
            for row in rows {
                let cells: Vec<String> = row
                    .iter()
                    .map(|v| v.map(|n| csv_escape(n.value())).unwrap_or_default())
                    .collect();
                println!("{}", cells.join(","));
            }
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("(no results)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(columns);

            for row in rows {
                let cells: Vec<String> = row
                    .iter()
                    .map(|v| v.map(Node::to_string).unwrap_or_default())
                    .collect();
                table.add_row(cells);
            }

            println!("{}", table);
            println!("{} row(s)", rows.len());
        }
    }
    Ok(())
}

fn json_value(node: Option<&Node>) -> serde_json::Value {
    match node {
        None => serde_json::Value::Null,
        Some(Node::Resource(n)) => serde_json::json!({ "type": "uri", "value": n.as_str() }),
        Some(Node::Literal(l)) => {
            let mut value = serde_json::json!({ "type": "literal", "value": l.value() });
            if let Some(lang) = l.language() {
                value["xml:lang"] = lang.into();
            } else {
                value["datatype"] = l.datatype().as_str().into();
            }
            value
        }
    }
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
