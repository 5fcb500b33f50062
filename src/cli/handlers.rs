use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::entity::{Priority, Status, TestCase};
use crate::error::{CaseforgeError, Result};
use crate::generation::{Generation, GenerationInput, GenerationService, SimilarCase};
use crate::integration::{input_from_ticket, IntegrationClient, MockJira};
use crate::push::{MockTracker, Push, PushGateway};
use crate::resolve::{ConflictResolver, RenamePrompt, Resolution};
use crate::review::{EditSession, ReviewReconciler};
use crate::search;
use crate::store::{ArtifactStore, JsonStore};
use crate::ticket::TicketKey;

const TRACKER_REGISTRY: &str = "tracker.json";

/// Find the project root by looking for .caseforge/ or .git/
fn find_project_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        if current.join(".caseforge").exists() || current.join(".git").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd,
        }
    }
}

fn runtime() -> Result<Runtime> {
    Ok(Runtime::new()?)
}

fn open_store() -> Result<Arc<JsonStore>> {
    Ok(Arc::new(JsonStore::open(&find_project_root())?))
}

fn print_case(case: &TestCase) {
    let id = case
        .id
        .map(|i| i.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("Test case {} - {}", id, case.title);
    println!("  status: {}  priority: {}", case.status, case.priority);
    if !case.tags.is_empty() {
        println!("  tags: {}", case.tags.join(", "));
    }
    if let Some(key) = &case.ticket_key {
        println!("  ticket: {}", key);
    }
    if let Some(ext) = &case.external_id {
        println!("  external id: {}", ext);
    }
    if let Some(from) = case.cloned_from {
        println!("  cloned from: {}", from);
    }
    if !case.description.is_empty() {
        println!("  description: {}", case.description);
    }
    for step in &case.steps {
        println!("  {}. {} -> {}", step.step_number, step.action, step.expected_result);
    }
}

fn print_similar(similar: &[SimilarCase]) {
    if similar.is_empty() {
        return;
    }
    println!("Similar existing cases:");
    for s in similar {
        let id = s
            .case
            .id
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:.2}  {} - {}", s.score, id, s.case.title);
    }
}

pub fn handle_init() -> Result<()> {
    let root = env::current_dir()?;

    let _store = JsonStore::init(&root)?;

    println!("Initialized caseforge project in {}", root.display());

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_generate(
    feature: Option<String>,
    criteria: Option<String>,
    context: Option<String>,
    priority: Option<String>,
    tags: Vec<String>,
    ticket: Option<String>,
    use_existing: bool,
    force_new: bool,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let generation = GenerationService::new(store.clone());
    let rt = runtime()?;

    rt.block_on(async {
        let parsed_priority = match &priority {
            Some(p) => Some(
                p.parse::<Priority>()
                    .map_err(CaseforgeError::InvalidInput)?,
            ),
            None => None,
        };

        let mut input = match &ticket {
            Some(raw_key) => {
                let key: TicketKey = raw_key.parse()?;
                let client = MockJira::with_fixtures();
                let fetched = client.fetch_ticket(&key).await?;
                input_from_ticket(&fetched)
            }
            None => GenerationInput {
                feature_description: feature.clone().unwrap_or_default(),
                acceptance_criteria: criteria.clone().unwrap_or_default(),
                ..Default::default()
            },
        };
        input.extra_context = context.clone();
        if parsed_priority.is_some() {
            input.priority = parsed_priority;
        }
        input.tags.extend(tags.iter().cloned());

        let (candidate, similar, adopted_existing) =
            match generation.generate(&input).await? {
                Generation::Fresh(generated) => (generated.candidate, generated.similar, false),
                Generation::Duplicate(conflict) => {
                    let existing_id = conflict.existing.id;
                    let existing_title = conflict.existing.title.clone();

                    let mut resolver = ConflictResolver::new();
                    resolver.offer(conflict, input.clone())?;

                    if use_existing {
                        let existing = resolver
                            .resolve(Resolution::UseExisting, &generation)
                            .await?;
                        (existing, Vec::new(), true)
                    } else if force_new {
                        let candidate = resolver
                            .resolve(Resolution::GenerateNew, &generation)
                            .await?;
                        (candidate, Vec::new(), false)
                    } else {
                        resolver.cancel();
                        eprintln!(
                            "Duplicate of test case {} - {}",
                            existing_id
                                .map(|i| i.to_string())
                                .unwrap_or_else(|| "-".to_string()),
                            existing_title
                        );
                        return Err(CaseforgeError::InvalidInput(
                            "an equivalent test case already exists; rerun with --use-existing or --force-new"
                                .to_string(),
                        ));
                    }
                }
            };

        let result = if adopted_existing || dry_run {
            candidate
        } else {
            store.create(candidate).await?
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            if adopted_existing {
                println!("Using existing test case.");
            } else if dry_run {
                println!("Candidate (not saved):");
            } else {
                println!(
                    "Created test case {} - {}",
                    result.id.map(|i| i.to_string()).unwrap_or_default(),
                    result.title
                );
            }
            print_case(&result);
            print_similar(&similar);
        }

        Ok(())
    })
}

pub fn handle_list(json: bool) -> Result<()> {
    let store = open_store()?;
    let rt = runtime()?;
    let cases = rt.block_on(store.list())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&cases)?);
    } else if cases.is_empty() {
        println!("No test cases yet. Run 'caseforge generate' to create one.");
    } else {
        for case in &cases {
            println!(
                "{:>4}  [{}] {:<8} {}",
                case.id.map(|i| i.to_string()).unwrap_or_default(),
                case.status,
                case.priority.to_string(),
                case.title
            );
        }
    }

    Ok(())
}

pub fn handle_get(id: u64, json: bool) -> Result<()> {
    let store = open_store()?;
    let rt = runtime()?;
    let case = rt.block_on(store.get(id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&case)?);
    } else {
        print_case(&case);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_edit(
    id: u64,
    title: Option<String>,
    description: Option<String>,
    feature: Option<String>,
    criteria: Option<String>,
    preconditions: Option<String>,
    expected: Option<String>,
    priority: Option<String>,
    status: Option<String>,
    tags: Vec<String>,
    remove_tags: Vec<String>,
    as_new: bool,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let reconciler = ReviewReconciler::new(store.clone());
    let rt = runtime()?;

    rt.block_on(async {
        let original = store.get(id).await?;
        let mut edited = original.clone();

        if let Some(title) = title {
            edited.title = title;
        }
        if let Some(description) = description {
            edited.description = description;
        }
        if let Some(feature) = feature {
            edited.feature_description = feature;
        }
        if let Some(criteria) = criteria {
            edited.acceptance_criteria = criteria;
        }
        if let Some(preconditions) = preconditions {
            edited.preconditions = preconditions;
        }
        if let Some(expected) = expected {
            edited.expected_result = expected;
        }
        if let Some(priority) = priority {
            edited.priority = priority
                .parse()
                .map_err(CaseforgeError::InvalidInput)?;
        }
        if let Some(status) = status {
            edited.status = status
                .parse()
                .map_err(CaseforgeError::InvalidInput)?;
        }
        for tag in tags {
            if !edited.tags.contains(&tag) {
                edited.tags.push(tag);
            }
        }
        edited.tags.retain(|t| !remove_tags.contains(t));

        let mut session = EditSession::new();
        session.open(original)?;

        let saved = if as_new {
            session.save_as_new(&reconciler, edited).await?
        } else {
            session.save(&reconciler, edited).await?
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&saved)?);
        } else if as_new {
            println!(
                "Saved as new test case {} (cloned from {})",
                saved.id.map(|i| i.to_string()).unwrap_or_default(),
                id
            );
        } else {
            println!(
                "Updated test case {} - {}",
                saved.id.map(|i| i.to_string()).unwrap_or_default(),
                saved.title
            );
        }

        Ok(())
    })
}

pub fn handle_delete(id: u64, force: bool) -> Result<()> {
    let store = open_store()?;
    let rt = runtime()?;

    rt.block_on(async {
        let case = store.get(id).await?;

        // Confirm deletion unless --force is used
        if !force {
            eprintln!("Delete test case {} - {}? [y/N] ", id, case.title);

            // Check if stdin is a tty for interactive confirmation
            if atty::is(atty::Stream::Stdin) {
                let mut input = String::new();
                io::stdin().read_line(&mut input)?;
                if !input.trim().eq_ignore_ascii_case("y") {
                    println!("Cancelled.");
                    return Ok(());
                }
            } else {
                // Non-interactive mode without --force, abort
                return Err(CaseforgeError::InvalidInput(
                    "Use --force to delete in non-interactive mode".to_string(),
                ));
            }
        }

        store.delete(id).await?;
        println!("Deleted test case {} - {}", id, case.title);

        Ok(())
    })
}

pub fn handle_search(query: String, json: bool) -> Result<()> {
    let store = open_store()?;
    let rt = runtime()?;
    let cases = rt.block_on(store.list())?;

    let results = search::search(&cases, &query);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if results.is_empty() {
        println!("No matches.");
    } else {
        for case in results {
            println!(
                "{:>4}  [{}] {:<8} {}",
                case.id.map(|i| i.to_string()).unwrap_or_default(),
                case.status,
                case.priority.to_string(),
                case.title
            );
        }
    }

    Ok(())
}

pub fn handle_push(id: u64, key: String, rename: Option<String>, json: bool) -> Result<()> {
    let root = find_project_root();
    let store = Arc::new(JsonStore::open(&root)?);
    let tracker = MockTracker::with_registry_file(&root.join(".caseforge").join(TRACKER_REGISTRY))?;
    let rt = runtime()?;

    rt.block_on(async {
        let key: TicketKey = key.parse()?;
        let mut case = store.get(id).await?;

        let receipt = match tracker.push(&case, &key).await? {
            Push::Accepted(receipt) => receipt,
            Push::NameConflict(conflict) => {
                let mut prompt = RenamePrompt::new(conflict);
                match rename {
                    Some(new_name) => {
                        case.title = prompt.accept(&new_name)?;
                        match tracker.push(&case, &key).await? {
                            Push::Accepted(receipt) => receipt,
                            Push::NameConflict(second) => {
                                eprintln!("'{}' also exists. Suggestions:", second.original_name);
                                for s in &second.suggested_names {
                                    eprintln!("  {}", s);
                                }
                                return Err(CaseforgeError::InvalidInput(
                                    "the replacement name also collides; pick another".to_string(),
                                ));
                            }
                        }
                    }
                    None => {
                        eprintln!(
                            "'{}' already exists in the external system. Suggestions:",
                            prompt.original_name()
                        );
                        for s in prompt.suggestions() {
                            eprintln!("  {}", s);
                        }
                        return Err(CaseforgeError::InvalidInput(
                            "name conflict; rerun with --rename <new name>".to_string(),
                        ));
                    }
                }
            }
        };

        case.external_id = Some(receipt.external_id.clone());
        case.status = Status::Active;
        let saved = store.update(id, case).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&saved)?);
        } else {
            println!(
                "Pushed test case {} - {} (external id {})",
                id, saved.title, receipt.external_id
            );
        }

        Ok(())
    })
}
