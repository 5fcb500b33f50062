use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "caseforge")]
#[command(version, about = "A test-case generation, review and push engine")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new caseforge project in the current directory
    Init,

    /// Generate a candidate test case from feature text or a ticket
    Generate {
        /// Feature description text
        #[arg(long)]
        feature: Option<String>,

        /// Acceptance criteria text
        #[arg(long)]
        criteria: Option<String>,

        /// Extra generation context
        #[arg(long)]
        context: Option<String>,

        /// Priority (low, medium, high, critical)
        #[arg(long)]
        priority: Option<String>,

        /// Tags (can be specified multiple times)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Fetch generation input from an external ticket (e.g. PROJ-101)
        #[arg(long, conflicts_with_all = ["feature", "criteria"])]
        ticket: Option<String>,

        /// On a duplicate conflict, adopt the existing test case
        #[arg(long, conflicts_with = "force_new")]
        use_existing: bool,

        /// On a duplicate conflict, force-generate a new test case
        #[arg(long, conflicts_with = "use_existing")]
        force_new: bool,

        /// Print the candidate without saving it
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List saved test cases
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Get a single test case by id
    Get {
        /// Test case id
        id: u64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit a saved test case
    Edit {
        /// Test case id
        id: u64,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description (restricted: forces --as-new)
        #[arg(long)]
        description: Option<String>,

        /// New feature description (restricted: forces --as-new)
        #[arg(long)]
        feature: Option<String>,

        /// New acceptance criteria (restricted: forces --as-new)
        #[arg(long)]
        criteria: Option<String>,

        /// New preconditions
        #[arg(long)]
        preconditions: Option<String>,

        /// New overall expected result
        #[arg(long)]
        expected: Option<String>,

        /// New priority (low, medium, high, critical)
        #[arg(long)]
        priority: Option<String>,

        /// New status (draft, active, deprecated)
        #[arg(long)]
        status: Option<String>,

        /// Tags to add (can be specified multiple times)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Tags to remove (can be specified multiple times)
        #[arg(long = "remove-tag")]
        remove_tags: Vec<String>,

        /// Save the edit as a new test case cloned from the original
        #[arg(long)]
        as_new: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a test case
    Delete {
        /// Test case id
        id: u64,

        /// Skip the confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Search saved test cases (filters: status:, priority:, tag:)
    Search {
        /// Query string
        query: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Push a test case to the external tracking system
    Push {
        /// Test case id
        id: u64,

        /// Target project key (e.g. PROJ-123)
        #[arg(long)]
        key: String,

        /// Replacement display name for retrying after a name conflict
        #[arg(long)]
        rename: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
