use crate::infra::InMemoryFleetStore;
use cartrack::accounts::HouseholdId;
use cartrack::error::AppError;
use cartrack::fleet::{
    CarDraft, FleetService, RenewalDraft, RenewalKind, UpcomingRenewal, DEFAULT_LOOKAHEAD_DAYS,
};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the reporting date (YYYY-MM-DD, defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Lookahead window in days.
    #[arg(long, default_value_t = DEFAULT_LOOKAHEAD_DAYS)]
    pub(crate) days: i64,
}

/// Seed a throwaway household and print its compliance report.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let fleet = FleetService::new(Arc::new(InMemoryFleetStore::default()));
    let household = HouseholdId::random();

    let hatchback = fleet.register_car(
        household,
        CarDraft {
            registration_number: "AB12 CDE".to_string(),
            make: Some("Toyota".to_string()),
            model: Some("Yaris".to_string()),
        },
    )?;
    let estate = fleet.register_car(
        household,
        CarDraft {
            registration_number: "XY64 QRS".to_string(),
            make: Some("Volvo".to_string()),
            model: Some("V60".to_string()),
        },
    )?;

    // Hatchback: insurance expiring inside the window, MOT already lapsed,
    // no tax history at all.
    fleet.record_renewal(
        household,
        hatchback.id,
        renewal(RenewalKind::Insurance, today - Duration::days(358), today + Duration::days(7)),
    )?;
    fleet.record_renewal(
        household,
        hatchback.id,
        renewal(RenewalKind::Mot, today - Duration::days(377), today - Duration::days(12)),
    )?;

    // Estate: everything covered well past the window, so it only surfaces
    // for the kinds with no record.
    fleet.record_renewal(
        household,
        estate.id,
        renewal(RenewalKind::Insurance, today - Duration::days(30), today + Duration::days(335)),
    )?;
    fleet.record_renewal(
        household,
        estate.id,
        renewal(RenewalKind::Mot, today - Duration::days(100), today + Duration::days(265)),
    )?;
    fleet.record_renewal(
        household,
        estate.id,
        renewal(RenewalKind::Tax, today - Duration::days(10), today + Duration::days(355)),
    )?;

    let report = fleet.upcoming(household, today, args.days)?;

    println!("Upcoming renewals as of {today} (next {} days)", args.days);
    println!("{:<12} {:<10} {:<10} {:<12} {:>6}", "REG", "KIND", "STATUS", "DUE", "DAYS");
    for row in &report {
        print_row(row);
    }
    if report.is_empty() {
        println!("(nothing due)");
    }

    Ok(())
}

fn renewal(kind: RenewalKind, valid_from: NaiveDate, valid_to: NaiveDate) -> RenewalDraft {
    RenewalDraft {
        kind,
        valid_from,
        valid_to,
        provider: None,
        reference: None,
        cost_pence: None,
        notes: None,
    }
}

fn print_row(row: &UpcomingRenewal) {
    let due = row
        .due_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| "-".to_string());
    let days = row
        .days_until
        .map(|days| days.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<12} {:<10} {:<10} {:<12} {:>6}",
        row.car_registration_number,
        row.kind.label(),
        row.status.label(),
        due,
        days
    );
}
