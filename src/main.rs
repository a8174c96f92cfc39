use clap::Parser;
use kdbx::cli::commands;
use kdbx::cli::commands::set::EntryFields;
use kdbx::cli::{output, Cli, Commands};
use kdbx::config::Settings;
use kdbx::errors::Result;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load(&std::env::current_dir()?)?;
    kdbx::logging::init(&settings.log_level);

    match cli.command {
        Commands::Create {
            ref file,
            ref name,
            compression,
            rounds,
        } => commands::create::execute(cli, &settings, file, name.as_deref(), compression, rounds),
        Commands::Info { ref file } => commands::info::execute(file),
        Commands::List { ref file } => commands::list::execute(cli, &settings, file),
        Commands::Get {
            ref file,
            ref title,
            ref field,
        } => commands::get::execute(cli, &settings, file, title, field),
        Commands::Set {
            ref file,
            ref title,
            ref username,
            ref url,
            ref notes,
            ref password,
        } => {
            let fields = EntryFields {
                username: username.as_deref(),
                url: url.as_deref(),
                notes: notes.as_deref(),
                password: password.as_deref(),
            };
            commands::set::execute(cli, &settings, file, title, &fields)
        }
        Commands::Delete {
            ref file,
            ref title,
            force,
        } => commands::delete::execute(cli, &settings, file, title, force),
        Commands::ExportXml {
            ref file,
            ref output,
        } => commands::export_xml::execute(cli, &settings, file, output.as_deref()),
        Commands::ImportXml { ref xml, ref file } => {
            commands::import_xml::execute(cli, &settings, xml, file)
        }
        Commands::Keyfile { ref path } => commands::keyfile::execute(path),
        Commands::Completions { ref shell } => commands::completions::execute(shell),
    }
}
