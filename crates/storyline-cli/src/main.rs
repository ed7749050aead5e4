use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use storyline_config::Config;
use storyline_engine::stats::PageItem;
use storyline_engine::{
    Dictionaries, Document, DocumentKind, ImportOptions, ScriptFile, Template, io, paginate,
    summarize,
};

#[derive(Parser)]
#[command(name = "storyline", version, about = "Convert, paginate and measure scripts")]
struct Cli {
    /// Config file to use instead of ~/.config/storyline/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a script between formats, picked by file extension
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Template name from the templates directory, or a path to a TOML file
        #[arg(short, long)]
        template: Option<String>,
        /// Document kind for formats that do not carry one
        #[arg(short, long)]
        kind: Option<String>,
    },
    /// Page count, running time and speaking parts
    Stats {
        input: PathBuf,
        #[arg(short, long)]
        template: Option<String>,
    },
    /// Print where every page starts and what breaks across pages
    Paginate {
        input: PathBuf,
        #[arg(short, long)]
        template: Option<String>,
    },
    /// Manage templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// List templates in the templates directory
    List,
    /// Print a template as TOML
    Show { name: String },
    /// Write the built-in template of a document kind to the templates directory
    Init {
        kind: String,
        #[arg(short, long)]
        name: Option<String>,
    },
}

/// Everything a command needs from the user's configuration.
struct Session {
    config: Config,
}

impl Session {
    fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map_or_else(Config::config_path, Path::to_path_buf);
        log::info!("Config path: {}", config_path.display());
        let config = Config::load_from_path(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
            .unwrap_or_default();
        Ok(Self { config })
    }

    fn kind(&self, requested: Option<&str>) -> Result<DocumentKind> {
        let id = requested.unwrap_or(&self.config.import.kind);
        DocumentKind::from_id(id).with_context(|| {
            let known: Vec<_> = DocumentKind::ALL.iter().map(|k| k.id()).collect();
            format!("Unknown document kind {id:?}, expected one of {}", known.join(", "))
        })
    }

    fn dictionaries(&self) -> Result<Dictionaries> {
        let Some(path) = &self.config.dictionaries_path else {
            return Ok(Dictionaries::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dictionaries {}", path.display()))?;
        Dictionaries::from_toml_str(&content)
            .with_context(|| format!("Failed to parse dictionaries {}", path.display()))
    }

    fn template(&self, requested: Option<&str>, kind: DocumentKind) -> Result<Template> {
        let Some(name) = requested.or(self.config.default_template.as_deref()) else {
            return Ok(Template::builtin(kind));
        };
        let path = if name.ends_with(".toml") || Path::new(name).exists() {
            PathBuf::from(name)
        } else {
            self.config.template_path(name)
        };
        Template::load_from_path(&path)
            .with_context(|| format!("Failed to load template {}", path.display()))
    }

    fn read(&self, input: &Path, kind: Option<&str>) -> Result<Document> {
        let options = ImportOptions {
            kind: self.kind(kind)?,
            dictionaries: self.dictionaries()?,
            ..ImportOptions::default()
        };
        let (root, file) = locate(input)?;
        io::read_script(&file, &root, &options)
            .with_context(|| format!("Failed to read {}", input.display()))
    }
}

/// Split a path into the folder it lives in and the script file inside it.
fn locate(path: &Path) -> Result<(PathBuf, ScriptFile)> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        bail!("{} does not name a file", path.display());
    };
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((root, ScriptFile::from(name)))
}

fn convert(
    session: &Session,
    input: &Path,
    output: &Path,
    template: Option<&str>,
    kind: Option<&str>,
) -> Result<()> {
    let document = session.read(input, kind)?;
    let template = session.template(template, document.kind())?;
    let (root, file) = locate(output)?;
    io::write_script(&file, &root, &document, &template)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Converted {} blocks from {} to {}",
        document.len(),
        input.display(),
        output.display()
    );
    Ok(())
}

fn stats(session: &Session, input: &Path, template: Option<&str>) -> Result<()> {
    let document = session.read(input, None)?;
    let template = session.template(template, document.kind())?;
    let table = paginate(&document, &template);
    let counts = summarize(&document);

    let seconds = table.duration.round() as u64;
    println!("Pages:      {:.2}", table.fractional_pages);
    println!("Duration:   {}:{:02}", seconds / 60, seconds % 60);
    println!("Scenes:     {}", counts.scenes);
    println!("Paragraphs: {}", counts.paragraphs);
    println!("Words:      {}", counts.words);
    println!(
        "Characters: {} ({} without spaces)",
        counts.characters_with_spaces, counts.characters_without_spaces
    );
    if !counts.characters.is_empty() {
        println!();
        println!("Speaking parts:");
        for character in &counts.characters {
            println!("  {:<24} {}", character.name, character.dialogues);
        }
    }
    if !counts.locations.is_empty() {
        println!();
        println!("Locations:");
        for location in &counts.locations {
            println!("  {location}");
        }
    }
    Ok(())
}

fn print_pages(document: &Document, template: &Template) {
    let table = paginate(document, template);
    for (index, page) in table.pages.iter().enumerate() {
        println!("Page {}", template.page.first_page_number as usize + index);
        for item in &page.items {
            match item {
                PageItem::Block {
                    block_id,
                    lines,
                    line,
                } => {
                    let Some(block) = document.block(*block_id) else {
                        continue;
                    };
                    let preview: String = block.text.chars().take(40).collect();
                    println!(
                        "  {line:>3}  {:<16} lines {}..{}  {preview}",
                        block.block_type.as_str(),
                        lines.start,
                        lines.end
                    );
                }
                PageItem::More { text, line, .. } | PageItem::Continued { text, line, .. } => {
                    println!("  {line:>3}  {:<16} {text}", "marker");
                }
            }
        }
    }
}

fn template_command(session: &Session, action: TemplateAction) -> Result<()> {
    match action {
        TemplateAction::List => {
            for path in session.config.list_templates()? {
                let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                match Template::load_from_path(&path) {
                    Ok(template) => {
                        println!("{name:<20} {} ({})", template.name, template.kind.id())
                    }
                    Err(e) => println!("{name:<20} unreadable: {e}"),
                }
            }
        }
        TemplateAction::Show { name } => {
            let kind = session.kind(None)?;
            let template = match DocumentKind::from_id(&name) {
                Some(builtin) => Template::builtin(builtin),
                None => session.template(Some(&name), kind)?,
            };
            print!("{}", template.to_toml_string()?);
        }
        TemplateAction::Init { kind, name } => {
            let kind = session.kind(Some(&kind))?;
            let template = Template::builtin(kind);
            let name = name.unwrap_or_else(|| template.id.clone());
            let path = session.config.template_path(&name);
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            template
                .save_to_path(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let session = Session::load(cli.config.as_deref())?;

    match cli.command {
        Command::Convert {
            input,
            output,
            template,
            kind,
        } => convert(
            &session,
            &input,
            &output,
            template.as_deref(),
            kind.as_deref(),
        ),
        Command::Stats { input, template } => stats(&session, &input, template.as_deref()),
        Command::Paginate { input, template } => {
            let document = session.read(&input, None)?;
            let template = session.template(template.as_deref(), document.kind())?;
            print_pages(&document, &template);
            Ok(())
        }
        Command::Template { action } => template_command(&session, action),
    }
}
