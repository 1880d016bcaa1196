use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use jarmap::analysis::{ClassImplementationsNode, ClassInheritanceNode, Relations};
use jarmap::entry::{ClassEntry, MethodDescriptor, MethodEntry};
use jarmap::index::JarIndexer;
use jarmap::mapping::{MappingFormat, MappingTranslator};
use jarmap::{ClassSource, Config, JarIndex};

/// jarmap - Jar indexing and name mappings for deobfuscating JVM bytecode
#[derive(Parser, Debug)]
#[command(name = "jarmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only errors are logged
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index a jar and print its statistics
    Index {
        /// Jar file or directory of class files
        jar: PathBuf,
    },

    /// Print the inheritance tree of a class
    Inheritance {
        jar: PathBuf,
        /// Class name (`pkg/Name` or `pkg.Name`)
        class: String,
    },

    /// Print the classes implementing an interface
    Implementations {
        jar: PathBuf,
        interface: String,
    },

    /// List the methods calling a method
    Callers {
        jar: PathBuf,
        owner: String,
        name: String,
        /// Method descriptor, e.g. `(I)V`
        desc: String,

        /// Include callers of every override and implementation
        #[arg(short, long)]
        recursive: bool,
    },

    /// Convert mappings between formats
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Input format (detected when omitted)
        #[arg(long, value_enum)]
        from: Option<FormatArg>,

        /// Output format (config default when omitted)
        #[arg(long, value_enum)]
        to: Option<FormatArg>,
    },

    /// Print the deobfuscated name of every mapped class in a jar
    DeobfuscateNames {
        jar: PathBuf,
        mappings: PathBuf,

        /// Mapping format (detected when omitted)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Enigma,
    EnigmaDirectory,
    Tiny,
    Srg,
}

impl From<FormatArg> for MappingFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Enigma => MappingFormat::EnigmaFile,
            FormatArg::EnigmaDirectory => MappingFormat::EnigmaDirectory,
            FormatArg::Tiny => MappingFormat::Tiny,
            FormatArg::Srg => MappingFormat::Srg,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let config = load_config(&cli)?;

    match &cli.command {
        Command::Index { jar } => {
            let index = load_index(jar, &config)?;
            print_stats(&index, cli.json)
        }
        Command::Inheritance { jar, class } => {
            let index = load_index(jar, &config)?;
            let tree = Relations::new(&index).class_inheritance(&class_entry(class));
            if cli.json {
                print_json(&tree)
            } else {
                print_inheritance(&tree, 0);
                Ok(())
            }
        }
        Command::Implementations { jar, interface } => {
            let index = load_index(jar, &config)?;
            let interface = class_entry(interface);
            let Some(tree) = Relations::new(&index).class_implementations(&interface) else {
                return Err(miette::miette!("{} is not an interface in this jar", interface));
            };
            if cli.json {
                print_json(&tree)
            } else {
                print_implementations(&tree, 0);
                Ok(())
            }
        }
        Command::Callers {
            jar,
            owner,
            name,
            desc,
            recursive,
        } => {
            let index = load_index(jar, &config)?;
            let method = MethodEntry::new(class_entry(owner), name, MethodDescriptor::new(desc));
            let callers = Relations::new(&index)
                .methods_referencing(&method, *recursive)
                .into_diagnostic()
                .wrap_err("Failed to collect callers")?;
            if cli.json {
                return print_json(&callers);
            }

            println!("{} {}", "Callers of".bold(), method.to_string().cyan());
            if callers.is_empty() {
                println!("  {}", "none".dimmed());
            }
            for reference in &callers {
                match &reference.context {
                    Some(context) => println!("  {} {}", context, format!("-> {}", reference.entry).dimmed()),
                    None => println!("  {}", reference.entry),
                }
            }
            Ok(())
        }
        Command::Convert {
            input,
            output,
            from,
            to,
        } => convert(input, output, *from, *to, &config, cli.json),
        Command::DeobfuscateNames {
            jar,
            mappings,
            format,
        } => deobfuscate_names(jar, mappings, *format, &config, cli.json),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Results go to stdout; logs stay out of the way of --json
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(config_path) = &cli.config {
        Config::from_file(config_path)
    } else {
        Config::from_default_locations(Path::new("."))
    }
}

fn load_index(jar: &Path, config: &Config) -> Result<JarIndex> {
    let classes = ClassSource::from_config(jar, config).load()?;
    info!("Loaded {} classes from {}", classes.len(), jar.display());

    JarIndexer::from_config(&config.index)
        .build(&classes)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to index {}", jar.display()))
}

fn class_entry(name: &str) -> ClassEntry {
    ClassEntry::new(name.replace('.', "/"))
}

fn resolve_format(path: &Path, format: Option<FormatArg>) -> Result<MappingFormat> {
    match format {
        Some(format) => Ok(format.into()),
        None => MappingFormat::detect(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read mappings: {}", path.display())),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{}", text);
    Ok(())
}

fn print_stats(index: &JarIndex, as_json: bool) -> Result<()> {
    let stats = index.stats();
    if as_json {
        return print_json(&stats);
    }

    println!("{}", "Jar index".bold());
    println!("  {:<18} {}", "classes", stats.classes.to_string().green());
    println!("  {:<18} {}", "fields", stats.fields);
    println!("  {:<18} {}", "methods", stats.methods);
    println!("  {:<18} {}", "references", stats.references);
    println!("  {:<18} {}", "inner classes", stats.inner_classes);
    println!("  {:<18} {}", "synthetic methods", stats.synthetic_methods);
    println!("  {:<18} {}", "bridge methods", stats.bridge_methods.to_string().yellow());
    Ok(())
}

fn print_inheritance(node: &ClassInheritanceNode, depth: usize) {
    let name = if depth == 0 {
        node.class.to_string().cyan().bold()
    } else {
        node.class.to_string().normal()
    };
    println!("{}{}", "  ".repeat(depth), name);
    for child in &node.children {
        print_inheritance(child, depth + 1);
    }
}

fn print_implementations(node: &ClassImplementationsNode, depth: usize) {
    let name = if depth == 0 {
        node.class.to_string().magenta().bold()
    } else {
        node.class.to_string().normal()
    };
    println!("{}{}", "  ".repeat(depth), name);
    for child in &node.children {
        print_implementations(child, depth + 1);
    }
}

fn convert(
    input: &Path,
    output: &Path,
    from: Option<FormatArg>,
    to: Option<FormatArg>,
    config: &Config,
    as_json: bool,
) -> Result<()> {
    let from = resolve_format(input, from)?;
    let to = to.map(MappingFormat::from).unwrap_or(config.mappings.format);

    let mappings = from
        .read(input)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {} mappings: {}", from, input.display()))?;
    to.write(&mappings, output, &config.mappings)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to write {} mappings: {}", to, output.display()))?;

    if as_json {
        return print_json(&json!({
            "from": from,
            "to": to,
            "mappings": mappings.len(),
        }));
    }
    println!(
        "{} {} mappings ({} -> {})",
        "Converted".green().bold(),
        mappings.len(),
        from,
        to
    );
    Ok(())
}

fn deobfuscate_names(
    jar: &Path,
    mappings_path: &Path,
    format: Option<FormatArg>,
    config: &Config,
    as_json: bool,
) -> Result<()> {
    let index = Arc::new(load_index(jar, config)?);
    let format = resolve_format(mappings_path, format)?;
    let mappings = format
        .read(mappings_path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read mappings: {}", mappings_path.display()))?;

    let translator = MappingTranslator::new(Arc::new(mappings)).with_index(Arc::clone(&index));
    let renamed: Vec<(ClassEntry, ClassEntry)> = index
        .class_entries()
        .filter_map(|class| {
            let translated = translator.translate_class(class);
            (translated != *class).then(|| (class.clone(), translated))
        })
        .collect();

    if as_json {
        let rows: Vec<_> = renamed
            .iter()
            .map(|(obf, deobf)| json!({ "obfuscated": obf, "deobfuscated": deobf }))
            .collect();
        return print_json(&rows);
    }

    for (obf, deobf) in &renamed {
        println!("{} {} {}", obf.to_string().dimmed(), "->".dimmed(), deobf.to_string().green());
    }
    info!("{} of {} classes renamed", renamed.len(), index.stats().classes);
    Ok(())
}
