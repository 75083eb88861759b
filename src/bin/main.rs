//! semlayer CLI - compile declarative JSON queries to dialect SQL
//!
//! Usage:
//!   semlayer compile <query.json> [--dialect postgres] [--output verbose]
//!   semlayer validate <query.json>
//!   semlayer list
//!   semlayer funnel <funnel.json> [--dialect postgres]
//!   semlayer flow <flow.json> [--dialect postgres]
//!   semlayer retention <retention.json> [--dialect postgres]

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use semlayer::analyses::{FlowCompiler, FlowPlan, FlowQuery, FunnelCompiler, FunnelQuery, RetentionCompiler, RetentionQuery};
use semlayer::filter::FilterCompiler;
use semlayer::input::{Query as InputQuery, ServerFlowQuery, ServerFunnelQuery, ServerRetentionQuery};
use semlayer::model::{BaseQuery, Cube, Dimension, FieldType, JoinSpec, Measure, Relationship, SecurityContext};
use semlayer::planner::Planner;
use semlayer::query_context::QueryContext;
use semlayer::registry::CubeRegistry;
use semlayer::sql::{lit_bool, Dialect, ExprExt, SqlDialect};
use semlayer::sql::Expr;
use semlayer::builder::SqlBuilder;

#[derive(Parser)]
#[command(name = "semlayer")]
#[command(about = "A semantic layer compiler: cubes, joins and analyses to multi-dialect SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON query against the demo schema
    Compile {
        /// Path to the query JSON file
        query: PathBuf,

        #[arg(short, long, default_value = "postgres")]
        dialect: DialectArg,

        #[arg(short, long, default_value = "sql")]
        output: OutputFormat,
    },

    /// Plan a query without generating SQL, reporting errors if any
    Validate {
        query: PathBuf,
    },

    /// List the demo schema's cubes, dimensions, and measures
    List,

    /// Compile a funnel analysis (`{"funnel": {...}}`) against the demo schema
    Funnel {
        query: PathBuf,

        #[arg(short, long, default_value = "postgres")]
        dialect: DialectArg,
    },

    /// Compile a flow analysis (`{"flow": {...}}`) against the demo schema
    Flow {
        query: PathBuf,

        #[arg(short, long, default_value = "postgres")]
        dialect: DialectArg,
    },

    /// Compile a retention analysis (`{"retention": {...}}`) against the demo schema
    Retention {
        query: PathBuf,

        #[arg(short, long, default_value = "postgres")]
        dialect: DialectArg,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Postgres,
    Mysql,
    Singlestore,
    Sqlite,
    Duckdb,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Singlestore => Dialect::SingleStore,
            DialectArg::Sqlite => Dialect::Sqlite,
            DialectArg::Duckdb => Dialect::DuckDb,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// SQL only
    Sql,
    /// SQL with a header describing the plan
    Verbose,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Compile { query, dialect, output } => cmd_compile(query, dialect, output),
        Commands::Validate { query } => cmd_validate(query),
        Commands::List => cmd_list(),
        Commands::Funnel { query, dialect } => cmd_funnel(query, dialect),
        Commands::Flow { query, dialect } => cmd_flow(query, dialect),
        Commands::Retention { query, dialect } => cmd_retention(query, dialect),
    }
}

fn cmd_compile(path: PathBuf, dialect: DialectArg, output: OutputFormat) -> ExitCode {
    let input = match read_query(&path) {
        Ok(q) => q,
        Err(code) => return code,
    };

    let registry = demo_registry();
    let dialect: Dialect = dialect.into();
    let ctx = QueryContext::new(SecurityContext::new(), dialect);

    let planner = Planner::new(&registry);
    let plan = match planner.plan(&input) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Planning error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let filter_compiler = FilterCompiler::new(&registry, &ctx);
    let now = chrono::Utc::now();
    let mut predicate: Option<Expr> = None;
    for filter in &input.filters {
        match filter_compiler.compile(filter, now) {
            Ok(compiled) => {
                predicate = Some(match predicate {
                    Some(existing) => existing.and(compiled.predicate),
                    None => compiled.predicate,
                });
            }
            Err(e) => {
                eprintln!("Filter error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let builder = SqlBuilder::new(&registry, &ctx);
    let built = match builder.build(&plan, predicate) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("SQL build error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let sql = built.to_sql(dialect);
    match output {
        OutputFormat::Sql => println!("{sql}"),
        OutputFormat::Verbose => {
            println!("-- semlayer compiled query");
            println!("-- Source: {}", path.display());
            println!("-- Primary cube: {}", plan.primary_cube);
            println!("-- Dialect: {}", dialect.name());
            println!();
            println!("{sql}");
        }
    }
    ExitCode::SUCCESS
}

fn cmd_validate(path: PathBuf) -> ExitCode {
    let input = match read_query(&path) {
        Ok(q) => q,
        Err(code) => return code,
    };
    let registry = demo_registry();
    let planner = Planner::new(&registry);
    match planner.plan(&input) {
        Ok(plan) => {
            println!(
                "OK: primary cube {}, {} join(s), {} select item(s)",
                plan.primary_cube,
                plan.joins.len(),
                plan.select.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Invalid query: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_list() -> ExitCode {
    let registry = demo_registry();
    for name in registry.cube_names() {
        let cube = registry.lookup(name).expect("listed cube exists");
        println!("{}", cube.name);
        let mut dims: Vec<&str> = cube.dimensions.keys().map(|k| k.as_str()).collect();
        dims.sort();
        for dim in dims {
            println!("  dimension {}.{}", cube.name, dim);
        }
        let mut measures: Vec<&str> = cube.measures.keys().map(|k| k.as_str()).collect();
        measures.sort();
        for measure in measures {
            println!("  measure   {}.{}", cube.name, measure);
        }
        println!();
    }
    ExitCode::SUCCESS
}

fn cmd_funnel(path: PathBuf, dialect: DialectArg) -> ExitCode {
    let wire: ServerFunnelQuery = match read_json(&path) {
        Ok(q) => q,
        Err(code) => return code,
    };
    let registry = demo_registry();
    let ctx = QueryContext::new(SecurityContext::new(), dialect.into());
    let query: FunnelQuery = wire.into();
    let compiler = FunnelCompiler::new(&registry, &ctx);
    match compiler.compile(&query, chrono::Utc::now()) {
        Ok(built) => {
            println!("{}", built.to_sql(ctx.dialect));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Funnel error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_flow(path: PathBuf, dialect: DialectArg) -> ExitCode {
    let wire: ServerFlowQuery = match read_json(&path) {
        Ok(q) => q,
        Err(code) => return code,
    };
    let registry = demo_registry();
    let ctx = QueryContext::new(SecurityContext::new(), dialect.into());
    let query: FlowQuery = wire.into();
    let compiler = FlowCompiler::new(&registry, &ctx);
    match compiler.compile(&query, chrono::Utc::now()) {
        Ok(FlowPlan::Window(built)) => {
            println!("{}", built.to_sql(ctx.dialect));
            ExitCode::SUCCESS
        }
        Ok(FlowPlan::Lateral(sql)) => {
            println!("{sql}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Flow error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_retention(path: PathBuf, dialect: DialectArg) -> ExitCode {
    let wire: ServerRetentionQuery = match read_json(&path) {
        Ok(q) => q,
        Err(code) => return code,
    };
    let registry = demo_registry();
    let ctx = QueryContext::new(SecurityContext::new(), dialect.into());
    let query: RetentionQuery = match wire.try_into() {
        Ok(q) => q,
        Err(e) => {
            eprintln!("Retention error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let compiler = RetentionCompiler::new(&registry, &ctx);
    match compiler.compile(&query, chrono::Utc::now()) {
        Ok(built) => {
            println!("{}", built.to_sql(ctx.dialect));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Retention error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read_query(path: &PathBuf) -> Result<InputQuery, ExitCode> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T, ExitCode> {
    let source = fs::read_to_string(path).map_err(|e| {
        eprintln!("Error reading {}: {e}", path.display());
        ExitCode::FAILURE
    })?;
    serde_json::from_str(&source).map_err(|e| {
        eprintln!("Error parsing {}: {e}", path.display());
        ExitCode::FAILURE
    })
}

/// A small `Customers` hasMany `Orders` schema plus a standalone `Events`
/// cube for the funnel/flow/retention subcommands, standing in for the
/// caller-supplied cube definitions a real deployment registers at
/// startup.
fn demo_registry() -> CubeRegistry {
    let mut registry = CubeRegistry::new();

    let customers = Cube::new("Customers", Arc::new(|_| BaseQuery::table("customers", lit_bool(true))))
        .with_dimension(Dimension::new("id", FieldType::Number, "id").primary_key())
        .with_dimension(Dimension::new("name", FieldType::String, "name"))
        .with_dimension(Dimension::new("country", FieldType::String, "country"))
        .with_dimension(Dimension::new("signedUpAt", FieldType::Time, "signed_up_at"))
        .with_measure(Measure::count("count"))
        .with_join(JoinSpec::new("Orders", Relationship::HasMany, vec![("id", "customer_id")]));

    let orders = Cube::new("Orders", Arc::new(|_| BaseQuery::table("orders", lit_bool(true))))
        .with_dimension(Dimension::new("id", FieldType::Number, "id").primary_key())
        .with_dimension(Dimension::new("customerId", FieldType::Number, "customer_id"))
        .with_dimension(Dimension::new("status", FieldType::String, "status"))
        .with_dimension(Dimension::new("placedAt", FieldType::Time, "placed_at"))
        .with_measure(Measure::count("count"))
        .with_measure(Measure::sum("totalRevenue", "amount"))
        .with_measure(Measure::calculated(
            "averageOrderValue",
            "{Orders.totalRevenue} / {Orders.count}",
        ));

    let events = Cube::new("Events", Arc::new(|_| BaseQuery::table("events", lit_bool(true))))
        .with_dimension(Dimension::new("id", FieldType::Number, "id").primary_key())
        .with_dimension(Dimension::new("userId", FieldType::Number, "user_id"))
        .with_dimension(Dimension::new("occurredAt", FieldType::Time, "occurred_at"))
        .with_dimension(Dimension::new("name", FieldType::String, "name"))
        .with_dimension(Dimension::new("plan", FieldType::String, "plan"))
        .with_measure(Measure::count("count"));

    registry.register(customers).expect("demo schema registers cleanly");
    registry.register(orders).expect("demo schema registers cleanly");
    registry.register(events).expect("demo schema registers cleanly");
    registry.finalize().expect("demo schema declares no dangling joins");
    registry
}
