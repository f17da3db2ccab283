use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Cook along with a chat assistant that keeps your recipe up to date", long_about = None)]
pub struct Cli {
    /// Path to a recipe text or HTML file to load before chatting
    #[arg(short, long, conflicts_with = "url")]
    pub recipe_file: Option<String>,

    /// URL of a recipe page to load before chatting
    #[arg(short, long)]
    pub url: Option<String>,

    /// Model to request from OpenRouter (overrides RECIPE_CHEF_MODEL)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Move the current-step marker to the first incomplete step when the model gets it wrong
    #[arg(long)]
    pub promote_current_step: bool,

    /// Dietary restriction the assistant must respect (repeatable)
    #[arg(long = "restriction")]
    pub restrictions: Vec<String>,

    /// Preference the assistant should follow where possible (repeatable)
    #[arg(long = "preference")]
    pub preferences: Vec<String>,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

/// A line typed into the chat loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Message(String),
    Undo,
    ShowStep,
    ShowRecipe,
    Quit,
    Empty,
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => ChatCommand::Empty,
            "/undo" => ChatCommand::Undo,
            "/step" => ChatCommand::ShowStep,
            "/recipe" => ChatCommand::ShowRecipe,
            "/quit" | "/exit" => ChatCommand::Quit,
            text => ChatCommand::Message(text.to_string()),
        }
    }
}
