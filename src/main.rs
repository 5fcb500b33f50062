use clap::Parser;
use caseforge::cli::{
    handle_delete, handle_edit, handle_generate, handle_get, handle_init, handle_list,
    handle_push, handle_search, Cli, Commands,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => handle_init(),
        Commands::Generate {
            feature,
            criteria,
            context,
            priority,
            tags,
            ticket,
            use_existing,
            force_new,
            dry_run,
            json,
        } => handle_generate(
            feature,
            criteria,
            context,
            priority,
            tags,
            ticket,
            use_existing,
            force_new,
            dry_run,
            json,
        ),
        Commands::List { json } => handle_list(json),
        Commands::Get { id, json } => handle_get(id, json),
        Commands::Edit {
            id,
            title,
            description,
            feature,
            criteria,
            preconditions,
            expected,
            priority,
            status,
            tags,
            remove_tags,
            as_new,
            json,
        } => handle_edit(
            id,
            title,
            description,
            feature,
            criteria,
            preconditions,
            expected,
            priority,
            status,
            tags,
            remove_tags,
            as_new,
            json,
        ),
        Commands::Delete { id, force } => handle_delete(id, force),
        Commands::Search { query, json } => handle_search(query, json),
        Commands::Push {
            id,
            key,
            rename,
            json,
        } => handle_push(id, key, rename, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
