use chrono::{Local, NaiveDate};
use serde_json::json;
use tether::protocol::{Arguments, ToolDescriptor};
use tether::tools::{Tool, ToolFuture, ToolOutcome};

/// Reports today's weekday and date in the host's local time zone.
pub struct CurrentDay;

impl Tool for CurrentDay {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            super::CURRENT_DAY,
            "Get the current day of the week and today's date",
            json!({ "type": "object", "properties": {} }),
        )
    }

    fn execute(&self, _arguments: &Arguments) -> ToolFuture<'_> {
        let today = Local::now().date_naive();
        Box::pin(async move { ToolOutcome::text(describe_day(today)) })
    }
}

fn describe_day(date: NaiveDate) -> String {
    format!("Today is {}.", date.format("%A, %B %-d, %Y"))
}
