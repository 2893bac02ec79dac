use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use studytrack_core::{
    DeltaMode, Frequency, GoalDraft, Milestone, RecurrencePattern, Reward, RewardCondition,
    StudyService,
};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum GoalCmd {
    /// Create a new goal
    Create {
        title: String,
        /// Target quantity to reach
        #[arg(long)]
        target: f64,
        /// Unit of the target (e.g. minutes, pages)
        #[arg(long, default_value = "minutes")]
        unit: String,
        #[arg(long, default_value = "")]
        category: String,
        /// Topic references, repeatable
        #[arg(long = "topic")]
        topics: Vec<String>,
        /// Window length in days from now
        #[arg(long, default_value = "30")]
        days: u32,
        /// Milestone thresholds, repeatable, ascending
        #[arg(long = "milestone")]
        milestones: Vec<f64>,
        /// Attach a completion reward with this description
        #[arg(long)]
        reward: Option<String>,
        /// Recurrence: daily, weekly, or monthly
        #[arg(long)]
        recur: Option<String>,
        /// Recurrence interval multiplier
        #[arg(long, default_value = "1")]
        interval: u32,
        /// Stop recurring after this many instances in total
        #[arg(long)]
        occurrences: Option<u32>,
    },
    /// Apply a progress delta
    Progress {
        id: Uuid,
        /// Amount to add (or the value to set with --set)
        amount: f64,
        /// Replace the current value instead of adding
        #[arg(long)]
        set: bool,
    },
    /// Print one goal as JSON
    Show { id: Uuid },
    /// List all goals as JSON
    List,
}

fn parse_frequency(freq: &str) -> Result<Frequency, Box<dyn std::error::Error>> {
    match freq {
        "daily" => Ok(Frequency::Daily),
        "weekly" => Ok(Frequency::Weekly),
        "monthly" => Ok(Frequency::Monthly),
        other => Err(format!("unknown recurrence frequency '{other}'").into()),
    }
}

pub fn run(cmd: GoalCmd, owner: &str) -> Result<(), Box<dyn std::error::Error>> {
    let svc = StudyService::open()?;
    let now: DateTime<Utc> = Utc::now();

    match cmd {
        GoalCmd::Create {
            title,
            target,
            unit,
            category,
            topics,
            days,
            milestones,
            reward,
            recur,
            interval,
            occurrences,
        } => {
            let recurrence = recur
                .as_deref()
                .map(parse_frequency)
                .transpose()?
                .map(|frequency| RecurrencePattern {
                    frequency,
                    interval,
                    end_date: None,
                    end_after_occurrences: occurrences,
                });
            let draft = GoalDraft {
                owner_id: owner.to_string(),
                title,
                category,
                topic_ids: topics,
                target_value: target,
                unit,
                start_date: now,
                end_date: now + Duration::days(i64::from(days)),
                milestones: milestones
                    .into_iter()
                    .enumerate()
                    .map(|(i, value)| Milestone::new(i, format!("milestone {}", i + 1), value))
                    .collect(),
                rewards: reward
                    .map(|r| vec![Reward::new(RewardCondition::Completion, r)])
                    .unwrap_or_default(),
                recurrence,
            };
            let (goal, _event) = svc.create_goal(draft, now)?;
            println!("{}", serde_json::to_string_pretty(&goal)?);
        }
        GoalCmd::Progress { id, amount, set } => {
            let mode = if set { DeltaMode::Set } else { DeltaMode::Add };
            let (goal, events) = svc.apply_goal_progress(owner, id, amount, mode, now)?;
            println!("{}", serde_json::to_string_pretty(&events)?);
            eprintln!(
                "Goal {}: {}/{} {} ({})",
                goal.id, goal.current_value, goal.target_value, goal.unit, goal.status
            );
        }
        GoalCmd::Show { id } => {
            let goal = svc.get_goal(owner, id)?;
            println!("{}", serde_json::to_string_pretty(&goal)?);
        }
        GoalCmd::List => {
            let goals = svc.list_goals(owner)?;
            println!("{}", serde_json::to_string_pretty(&goals)?);
        }
    }
    Ok(())
}
