use anyhow::{Context, Result};
use recipe_chef::api_connection::Provider;
use recipe_chef::cli::{parse_args, ChatCommand, Cli};
use recipe_chef::config::ChefConfig;
use recipe_chef::conversation::Speaker;
use recipe_chef::generation::{ChatCompletionGenerator, UserProfile};
use recipe_chef::image_search::GoogleImageSearch;
use recipe_chef::reconcile::CurrentStepPolicy;
use recipe_chef::state_store::{RecipeStateStore, RejectReason, SubmitOutcome};
use recipe_chef::web_scrape::{fetch_recipe_page, read_recipe_file};
use recipe_chef::RecipeDocument;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

fn build_store(cli: &Cli, config: &ChefConfig) -> RecipeStateStore {
    let provider = Provider::openrouter(&config.api_key_env_var).with_timeout(config.generation_timeout);
    let profile = UserProfile {
        name: None,
        restrictions: cli.restrictions.clone(),
        preferences: cli.preferences.clone(),
    };
    let provider_name = provider.name();
    let generator = ChatCompletionGenerator::new(provider, config.model.clone()).with_profile(profile);
    log::info!("Generating with {} model '{}'", provider_name, generator.model());

    if !config.image_search_configured() {
        log::warn!("Google image search is not configured; step images will stay unresolved");
    }
    let images = GoogleImageSearch::new(
        config.google_api_key.clone().unwrap_or_default(),
        config.google_search_engine_id.clone().unwrap_or_default(),
    )
    .with_blocklist(config.blocked_domains.clone())
    .with_timeout(config.image_timeout);

    RecipeStateStore::new(Arc::new(generator), Arc::new(images), config.store_options())
}

fn print_active_step(document: Option<&RecipeDocument>) {
    let Some(document) = document else {
        println!("No recipe loaded yet. Paste one, or start asking Chef some questions!");
        return;
    };
    let total = document.steps().len();
    match document.active_step_index() {
        Some(idx) => {
            println!("Step {}/{}: {}", idx + 1, total, document.steps()[idx].text);
            for note in &document.steps()[idx].notes {
                println!("  note: {}", note);
            }
            if let Some(url) = document.active_step_image().and_then(|urls| urls.first()) {
                println!("  image: {}", url);
            }
        }
        None if total > 0 => println!("All {} steps done. Enjoy!", total),
        None => {}
    }
}

fn print_recipe(document: &RecipeDocument) {
    println!("\n{}", document.title);
    if let Some(description) = &document.description {
        println!("{}", description);
    }
    println!("\nIngredients:");
    for line in &document.ingredients.items {
        println!("  - {}", line.text);
    }
    println!("\nInstructions:");
    for (idx, step) in document.steps().iter().enumerate() {
        let marker = if step.completed {
            "x"
        } else if step.current {
            ">"
        } else {
            " "
        };
        println!("  [{}] {}. {}", marker, idx + 1, step.text);
    }
    println!();
}

async fn report_outcome(store: &RecipeStateStore, outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Rejected(RejectReason::EmptyInput) => {}
        SubmitOutcome::Rejected(RejectReason::Busy) => {
            println!("Chef is still working on the last request.");
        }
        SubmitOutcome::Completed(_) | SubmitOutcome::Apologized => {
            let transcript = store.transcript().await;
            if let Some(turn) = transcript.iter().rev().find(|t| t.speaker == Speaker::Assistant) {
                println!("\nChef: {}\n", turn.text);
            }
            print_active_step(store.current().await.as_ref());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = parse_args();
    let mut config = ChefConfig::from_env().context("Invalid recipe_chef configuration")?;
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if cli.promote_current_step {
        config.current_step_policy = CurrentStepPolicy::PromoteFirstIncomplete;
    }

    let store = build_store(&cli, &config);

    let initial = if let Some(path) = &cli.recipe_file {
        Some(read_recipe_file(path).await?)
    } else if let Some(url) = &cli.url {
        Some(fetch_recipe_page(url).await?)
    } else {
        None
    };

    if let Some(raw_text) = initial {
        println!("Loading your recipe...");
        let outcome = store.load_from_external_source(&raw_text).await;
        if let Some(document) = store.current().await {
            print_recipe(&document);
        }
        report_outcome(&store, outcome).await;
    } else {
        println!("Paste a recipe, or start asking Chef some questions! (/step, /recipe, /undo, /quit)");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };

        match ChatCommand::parse(&line) {
            ChatCommand::Empty => continue,
            ChatCommand::Quit => break,
            ChatCommand::ShowStep => print_active_step(store.current().await.as_ref()),
            ChatCommand::ShowRecipe => match store.current().await {
                Some(document) => print_recipe(&document),
                None => print_active_step(None),
            },
            ChatCommand::Undo => {
                if store.revert_to_previous().await {
                    println!("Restored the previous version of the recipe.");
                    print_active_step(store.current().await.as_ref());
                } else {
                    println!("Nothing to undo.");
                }
            }
            ChatCommand::Message(text) => {
                let outcome = store.submit_user_message(&text).await;
                report_outcome(&store, outcome).await;
            }
        }
    }

    Ok(())
}
