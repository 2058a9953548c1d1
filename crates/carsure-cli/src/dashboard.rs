use carsure_core::{process_dashboard_data, AppConfig, DashboardData};
use carsure_firebase::{fetch_all_users_data, FirebaseClient};

const FIREBASE_TIMEOUT_SECS: u64 = 30;
const PER_USER_HISTORY_LIMIT: usize = 50;

/// Reads up to `max_users` users' history and prints the aggregate.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the user list cannot
/// be read.
pub(crate) async fn run_dashboard(
    config: &AppConfig,
    max_users: usize,
    limit: usize,
    auth_token: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let client = FirebaseClient::new(
        &config.firebase_database_url,
        FIREBASE_TIMEOUT_SECS,
        config.firebase_list_timeout_secs,
    )?;
    let users = fetch_all_users_data(&client, max_users, PER_USER_HISTORY_LIMIT, auth_token).await?;
    let data = process_dashboard_data(&users, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        print_summary(&data);
    }
    Ok(())
}

fn print_summary(data: &DashboardData) {
    if data.total_analyses == 0 {
        println!("no analyses stored across {} users", data.total_users);
        return;
    }

    println!("users:              {}", data.total_users);
    println!("analyses:           {}", data.total_analyses);
    println!("total est. cost:    {:.2}", data.total_estimated_cost);
    println!("avg repair cost:    {:.2}", data.average_repair_cost);
    println!("avg confidence:     {:.2}", data.average_confidence);

    println!();
    println!("{:<24}COUNT", "DAMAGE TYPE");
    for (damage_type, count) in &data.damage_type_distribution {
        println!("{damage_type:<24}{count}");
    }

    println!();
    println!("{:<10}{:<8}TOTAL COST", "MONTH", "COUNT");
    for trend in &data.monthly_trends {
        println!("{:<10}{:<8}{:.2}", trend.month, trend.count, trend.total_cost);
    }

    println!();
    println!("{:<26}{:<20}{:<10}FILE", "UPLOADED", "DAMAGE", "SEVERITY");
    for recent in &data.recent_analyses {
        println!(
            "{:<26}{:<20}{:<10}{}",
            recent.uploaded_at, recent.damage_type, recent.severity, recent.filename
        );
    }
}
