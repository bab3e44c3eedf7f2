//! Console rendering of controller events and stored records.

use autopark_controller::{ControllerEvent, Receipt};
use autopark_storage::{GateEvent, ParkingSession, TariffConfig, format_duration};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn receipt(receipt: &Receipt, tariff: &TariffConfig) -> String {
    [
        "---------- PARKING RECEIPT ----------".to_string(),
        format!("Plate:    {}", receipt.plate),
        format!("Slot:     {}", receipt.slot_id),
        format!("Entry:    {}", receipt.entry_time.format(TIME_FORMAT)),
        format!("Exit:     {}", receipt.exit_time.format(TIME_FORMAT)),
        format!("Duration: {}", receipt.duration),
        format!("Fee:      {}", tariff.format_amount(receipt.fee)),
        "-------------------------------------".to_string(),
    ]
    .join("\n")
}

/// One line per event, or `None` for events only worth a log line.
pub fn event_line(event: &ControllerEvent, tariff: &TariffConfig) -> Option<String> {
    match event {
        ControllerEvent::Receipt(r) => Some(receipt(r, tariff)),
        ControllerEvent::EntryGranted { plate, slot_id, at } => Some(format!(
            "ENTRY  {plate} -> slot {slot_id} at {}",
            at.format(TIME_FORMAT)
        )),
        ControllerEvent::EntryRejected { plate, reason } => {
            Some(format!("REJECT {plate}: {reason}"))
        }
        ControllerEvent::Alert {
            gate,
            plate,
            message,
        } => Some(format!(
            "ALERT  [{gate}] {}: {message}",
            plate.as_ref().map_or("-".to_string(), ToString::to_string)
        )),
        ControllerEvent::GateFault {
            gate,
            command,
            message,
            ..
        } => Some(format!("FAULT  [{gate}] {command}: {message}")),
        ControllerEvent::SlotChanged { .. }
        | ControllerEvent::DuplicateIgnored { .. }
        | ControllerEvent::RecognitionFailed { .. } => None,
    }
}

pub fn session_row(session: &ParkingSession, tariff: &TariffConfig) -> String {
    match (session.exit_time, session.fee) {
        (Some(exit), Some(fee)) => format!(
            "{:<10} slot {:<3} {} -> {}  {:<20} {}",
            session.plate.as_str(),
            session.slot_id.to_string(),
            session.entry_time.format(TIME_FORMAT),
            exit.format(TIME_FORMAT),
            format_duration(session.entry_time, exit),
            tariff.format_amount(fee),
        ),
        _ => format!(
            "{:<10} slot {:<3} since {}",
            session.plate.as_str(),
            session.slot_id.to_string(),
            session.entry_time.format(TIME_FORMAT),
        ),
    }
}

pub fn gate_event_row(event: &GateEvent) -> String {
    format!(
        "#{:<5} {} {:<5} {:<20} {:<10} {}",
        event.id,
        event.timestamp.format(TIME_FORMAT),
        event.direction.as_str(),
        event.kind.as_str(),
        event.plate.as_deref().unwrap_or("-"),
        event.detail.as_deref().unwrap_or(""),
    )
    .trim_end()
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopark_core::{Direction, Money, Plate, SlotId};
    use autopark_storage::GateEventKind;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_receipt_layout() {
        let entry = Utc.with_ymd_and_hms(2025, 5, 20, 7, 30, 0).unwrap();
        let exit = Utc.with_ymd_and_hms(2025, 5, 20, 10, 0, 0).unwrap();
        let text = receipt(
            &Receipt {
                plate: Plate::new("AB12CDE").unwrap(),
                slot_id: SlotId::FIRST,
                entry_time: entry,
                exit_time: exit,
                duration: format_duration(entry, exit),
                fee: Money::from_minor(600),
            },
            &TariffConfig::default(),
        );

        assert!(text.contains("Plate:    AB12CDE"));
        assert!(text.contains("Duration: 2 hours 30 minutes"));
        assert!(text.contains("Fee:      $6.00"));
    }

    #[test]
    fn test_quiet_events_not_printed() {
        let event = ControllerEvent::DuplicateIgnored {
            plate: Plate::new("AB12CDE").unwrap(),
        };
        assert_eq!(event_line(&event, &TariffConfig::default()), None);
    }

    #[test]
    fn test_alert_without_plate() {
        let event = ControllerEvent::Alert {
            gate: Direction::Exit,
            plate: None,
            message: "no entry record".to_string(),
        };
        assert_eq!(
            event_line(&event, &TariffConfig::default()).unwrap(),
            "ALERT  [exit] -: no entry record"
        );
    }

    #[test]
    fn test_active_session_row() {
        let entry = Utc.with_ymd_and_hms(2025, 5, 20, 7, 30, 0).unwrap();
        let session = ParkingSession::begin(Plate::new("XY99ZZZ").unwrap(), SlotId::FIRST, entry);
        assert_eq!(
            session_row(&session, &TariffConfig::default()),
            "XY99ZZZ    slot 1   since 2025-05-20 07:30:00"
        );
    }

    #[test]
    fn test_gate_event_row() {
        let at = Utc.with_ymd_and_hms(2025, 5, 20, 7, 30, 0).unwrap();
        let mut event = GateEvent::new(GateEventKind::ExitDenied, Direction::Exit, at)
            .with_plate(&Plate::new("XY99ZZZ").unwrap());
        event.id = 7;
        assert_eq!(
            gate_event_row(&event),
            "#7     2025-05-20 07:30:00 exit  exit_denied          XY99ZZZ"
        );
    }
}
