use crate::domain::event::Event;
use crate::domain::registration::Registration;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct EventRow<'a> {
    id: &'a str,
    name: &'a str,
    department: &'a str,
    max_team_size: u32,
    entry_fee: String,
}

#[derive(Serialize)]
struct RegistrationRow<'a> {
    id: &'a str,
    event_id: &'a str,
    event_name: &'a str,
    team_size: u32,
    participant_names: &'a str,
    email: &'a str,
    mobile: &'a str,
    college: &'a str,
    department: &'a str,
    year_of_study: &'a str,
    city: &'a str,
    total_fee: String,
    order_id: &'a str,
    payment_id: &'a str,
    registered_at: String,
}

/// Writes catalog events and recorded registrations as CSV.
pub struct CsvExporter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvExporter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_events<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) -> Result<()> {
        for event in events {
            self.writer.serialize(EventRow {
                id: &event.id,
                name: &event.name,
                department: &event.department,
                max_team_size: event.max_team_size,
                entry_fee: event.entry_fee.normalize().to_string(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_registrations(&mut self, registrations: &[Registration]) -> Result<()> {
        for r in registrations {
            self.writer.serialize(RegistrationRow {
                id: &r.id,
                event_id: &r.event_id,
                event_name: &r.event_name,
                team_size: r.team_size,
                participant_names: &r.participant_names,
                email: &r.email,
                mobile: &r.mobile,
                college: &r.college,
                department: &r.department,
                year_of_study: &r.year_of_study,
                city: &r.city,
                total_fee: r.total_fee.normalize().to_string(),
                order_id: &r.order_id,
                payment_id: &r.payment_id,
                registered_at: r.registered_at.to_rfc3339(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
