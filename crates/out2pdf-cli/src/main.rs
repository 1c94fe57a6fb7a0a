mod compiler;
mod report;

use anyhow::{Context, Result, bail};
use compiler::{CompilerDriver, CompilerError};
use encoding_rs::Encoding;
use out2pdf_config::Config;
use out2pdf_engine::{REQUIRED_PACKAGES, Section, SectionInput, convert_document, to_latex};
use std::{env, fs, path::PathBuf, process};

const USAGE: &str = "Usage: out2pdf [--tex-only] <code> <output-dir> <label>:<class>:<report> [<label>:<class>:<report> ...]";

/// One `<label>:<class>:<report>` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SectionArg {
    label: String,
    class: String,
    report: PathBuf,
}

impl SectionArg {
    fn parse(arg: &str) -> Result<Self> {
        // The report path goes last so it may itself contain ':'.
        let mut parts = arg.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(label), Some(class), Some(report))
                if !label.is_empty() && !class.is_empty() && !report.is_empty() =>
            {
                Ok(Self {
                    label: label.to_string(),
                    class: class.to_string(),
                    report: PathBuf::from(report),
                })
            }
            _ => bail!("invalid section '{arg}', expected <label>:<class>:<report>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    tex_only: bool,
    code: String,
    output_dir: PathBuf,
    sections: Vec<SectionArg>,
}

impl Invocation {
    fn parse(args: &[String]) -> Result<Self> {
        let tex_only = args.iter().any(|a| a == "--tex-only");
        let positional: Vec<&String> = args.iter().filter(|a| *a != "--tex-only").collect();

        if let Some(flag) = positional.iter().find(|a| a.starts_with("--")) {
            bail!("unknown option '{flag}'");
        }
        let [code, output_dir, sections @ ..] = positional.as_slice() else {
            bail!("missing <code> and <output-dir>");
        };
        if sections.is_empty() {
            bail!("at least one section is required");
        }

        Ok(Self {
            tex_only,
            code: code.to_string(),
            output_dir: PathBuf::from(output_dir),
            sections: sections
                .iter()
                .map(|s| SectionArg::parse(s))
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

fn load_inputs(invocation: &Invocation, config: &Config) -> Result<Vec<SectionInput>> {
    let fallback = Encoding::for_label(config.fallback_encoding.as_bytes())
        .with_context(|| format!("Unknown report encoding '{}'", config.fallback_encoding))?;
    let count = invocation.sections.len();
    invocation
        .sections
        .iter()
        .enumerate()
        .map(|(i, arg)| -> Result<SectionInput> {
            let lines = report::strip_title_page(report::read_report(&arg.report, fallback)?);
            Ok(SectionInput {
                document: arg.report.display().to_string(),
                class: arg.class.clone(),
                lines,
                section: Section::new(&arg.label, &invocation.code, i + 1 == count),
            })
        })
        .collect()
}

fn run(invocation: &Invocation, config: &Config) -> Result<()> {
    let registry = config.load_registry()?;
    let inputs = load_inputs(invocation, config)?;
    let tokens = convert_document(&registry, inputs, config.annotate_options())?;

    fs::create_dir_all(&invocation.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            invocation.output_dir.display()
        )
    })?;
    let tex_path = invocation
        .output_dir
        .join(format!("{}.tex", invocation.code));
    fs::write(&tex_path, to_latex(&tokens, &config.latex))
        .with_context(|| format!("Failed to write {}", tex_path.display()))?;
    log::info!("wrote {}", tex_path.display());

    if invocation.tex_only {
        return Ok(());
    }

    let driver = CompilerDriver::new(config.compiler.clone());
    driver.ensure_packages(REQUIRED_PACKAGES)?;
    driver.compile(&tex_path, &invocation.output_dir)?;
    log::info!(
        "created {}",
        invocation
            .output_dir
            .join(format!("{}.pdf", invocation.code))
            .display()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let invocation = match Invocation::parse(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    let config = match Config::load() {
        Ok(Some(config)) => config,
        Ok(None) => Config::default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Config file location: {}", Config::config_path().display());
            process::exit(1);
        }
    };

    if let Err(e) = run(&invocation, &config) {
        eprintln!("Error: {e:#}");
        if let Some((stdout, stderr)) = e
            .downcast_ref::<CompilerError>()
            .and_then(CompilerError::output)
        {
            eprintln!("{stdout}");
            eprintln!("{stderr}");
        }
        process::exit(1);
    }
}
