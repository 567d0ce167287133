use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{bail, eyre, WrapErr};
use log::info;

use dd_merge::diagram::DecisionDiagram;
use dd_merge::facts::{parse_facts, to_text, FactSet};
use dd_merge::operator::{operator, operators};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Operator to run (average, majority, unfold, normalize).
    #[arg(value_name = "OPERATOR")]
    operator: String,

    /// Fact files. Binary operators take one file per argument, unary operators
    /// treat every file as one answer set of their single argument.
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Operator parameter, e.g. `unknown=undecided` or `normalize=false`.
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Print the result as Graphviz DOT instead of facts.
    #[clap(long)]
    dot: bool,

    /// Log debug traces of the engine.
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        if args.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let Some(op) = operator(&args.operator) else {
        let names: Vec<_> = operators().iter().map(|op| op.name()).collect();
        bail!("unknown operator '{}', expected one of: {}", args.operator, names.join(", "));
    };

    let params = args
        .params
        .iter()
        .map(|p| {
            p.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| eyre!("parameter '{}' is not of the form KEY=VALUE", p))
        })
        .collect::<color_eyre::Result<Vec<_>>>()?;

    let mut sets: Vec<FactSet> = Vec::new();
    for path in &args.files {
        let text = std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
        let facts = parse_facts(&text).wrap_err_with(|| format!("parsing {}", path.display()))?;
        info!("Read {} fact(s) from {}", facts.len(), path.display());
        sets.push(facts);
    }

    let answers: Vec<Vec<FactSet>> = if op.arity() == 1 {
        vec![sets]
    } else {
        sets.into_iter().map(|s| vec![s]).collect()
    };

    let result = op.apply(&answers, &params)?;
    info!("{} produced {} answer set(s)", op.name(), result.len());

    for (i, facts) in result.iter().enumerate() {
        if result.len() > 1 {
            println!("% answer set {}", i + 1);
        }
        if args.dot {
            let dd = DecisionDiagram::from_facts(facts)?;
            println!("// {} node(s), {} path(s)", dd.node_count(), dd.path_count());
            print!("{}", dd.to_dot()?);
        } else {
            print!("{}", to_text(facts));
        }
    }

    let time_total = time_total.elapsed();
    info!("All done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
