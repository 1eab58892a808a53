use colored::{Color, Colorize};
use drivesafe::types::{DrivingRecordDto, FatigueDto, FatigueLevel, MemberDto, RootResponse};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

const fn level_color(level: FatigueLevel) -> Color {
    match level {
        FatigueLevel::HighRisk => Color::Red,
        FatigueLevel::Elevated => Color::Yellow,
        FatigueLevel::Normal => Color::Green,
    }
}

fn format_time(time: Option<OffsetDateTime>) -> String {
    let Some(time) = time.filter(|t| t.unix_timestamp() != 0) else {
        return "-".to_string();
    };
    let local = UtcOffset::current_local_offset().map_or(time, |offset| time.to_offset(offset));
    local
        .format(&Rfc3339)
        .unwrap_or_else(|_| time.unix_timestamp().to_string())
}

fn format_id(id: Option<i64>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}

pub fn format_record(record: &FatigueDto) -> String {
    let level = record.fatigue_level();
    format!(
        "{:>6}  {:<25}  {:>5.1}  {:<9}  {}",
        format_id(record.id),
        format_time(record.effective_time()),
        record.score,
        level.as_str(),
        record.device.as_deref().unwrap_or("-")
    )
    .color(level_color(level))
    .to_string()
}

pub fn format_driving_record(record: &DrivingRecordDto) -> String {
    let level = record.fatigue_level();
    let synced = if record.synced { "✓" } else { " " };
    format!(
        "{synced} {:>6}  {:<25}  {:>5.1}  {:<9}  {}",
        format_id(record.id),
        format_time(record.recorded_time()),
        record.score,
        record.fatigue_level.as_deref().unwrap_or(level.as_str()),
        record.device.as_deref().unwrap_or("-")
    )
    .color(level_color(level))
    .to_string()
}

pub fn format_member(member: &MemberDto) -> String {
    format!(
        "{:>6}  {:<20}  {}",
        member.id_or_zero(),
        member.name.as_deref().unwrap_or("-"),
        member.email.as_deref().unwrap_or("-")
    )
}

pub fn format_root(root: &RootResponse) -> String {
    let mut parts = vec![format!("status: {}", root.status.as_deref().unwrap_or("unknown"))];
    if let Some(version) = &root.version {
        parts.push(format!("version: {version}"));
    }
    if let Some(message) = &root.message {
        parts.push(format!("message: {message}"));
    }
    if let Some(time) = root.time {
        parts.push(format!("time: {time}"));
    }
    parts.join(", ")
}
