use clap::Subcommand;
use featureprompt_core::{Config, EngagementState, PromptTrigger, SqliteStore, SystemClock};
use serde::Serialize;

#[derive(Subcommand)]
pub enum EngagementAction {
    /// Log an app launch
    Launch,
    /// Log a significant event
    Event,
    /// Print whether the prompt should show now, as JSON
    Check,
    /// Record that the prompt was shown
    Shown,
    /// Suppress the prompt until opted back in
    OptOut,
    /// Clear a previous opt-out
    OptIn,
    /// Delete all engagement data
    Reset,
    /// Print counters and stored engagement state as JSON
    Status,
}

type Trigger = PromptTrigger<SqliteStore, SystemClock>;

#[derive(Serialize)]
struct Status {
    opted_out: bool,
    launch_count: u64,
    significant_event_count: u64,
    total_prompts_shown: u64,
    state: EngagementState,
}

fn open_trigger() -> Result<Option<Trigger>, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = SqliteStore::open_default(&config.store.namespace)?;
    let trigger = config
        .prompt_configuration()
        .map(|prompt| PromptTrigger::with_system_clock(prompt, store))
        .transpose()?;
    Ok(trigger)
}

pub fn run(action: EngagementAction) -> Result<(), Box<dyn std::error::Error>> {
    let Some(mut trigger) = open_trigger()? else {
        println!("prompting disabled");
        return Ok(());
    };

    match action {
        EngagementAction::Launch => {
            trigger.log_app_launch()?;
            println!("launches: {}", trigger.current_launch_count());
        }
        EngagementAction::Event => {
            trigger.log_significant_event()?;
            println!("significant events: {}", trigger.current_significant_event_count());
        }
        EngagementAction::Check => {
            let eligibility = trigger.eligibility();
            println!("{}", serde_json::to_string_pretty(&eligibility)?);
        }
        EngagementAction::Shown => {
            trigger.record_prompt_shown()?;
            println!("prompts shown: {}", trigger.total_prompts_shown());
        }
        EngagementAction::OptOut => {
            trigger.user_did_opt_out()?;
            println!("opted out");
        }
        EngagementAction::OptIn => {
            trigger.reset_opt_out()?;
            println!("opted in");
        }
        EngagementAction::Reset => {
            trigger.reset_all_data()?;
            println!("engagement data reset");
        }
        EngagementAction::Status => {
            let status = Status {
                opted_out: trigger.is_opted_out(),
                launch_count: trigger.current_launch_count(),
                significant_event_count: trigger.current_significant_event_count(),
                total_prompts_shown: trigger.total_prompts_shown(),
                state: trigger.snapshot(),
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
