use busticket_models::Ticket;

const ISSUER: &str = "Transport Dept. of Delhi";
const WIDTH: usize = 44;

/// Receipt-style summary of a ticket, as shown by `book` and `ticket`.
pub fn render(ticket: &Ticket) -> String {
    let booking = &ticket.booking_data;
    let rule = "-".repeat(WIDTH);
    let price = format!("₹{:.2}", ticket.final_price);
    let fare = format!("₹{}", ticket.fare);

    let mut lines = vec![
        format!("{ISSUER:^WIDTH$}"),
        String::new(),
        pair(&ticket.ticket_number, &price),
        rule.clone(),
        pair("Bus Route", "Fare"),
        pair(&booking.route, &fare),
        String::new(),
        pair("Booking Time", "Tickets"),
        pair(&ticket.booking_time, &booking.tickets.to_string()),
        String::new(),
        "Starting stop".to_string(),
        booking.from.clone(),
        String::new(),
        "Ending stop".to_string(),
        booking.to.clone(),
        rule,
    ];
    lines.push(format!("{:^WIDTH$}", ticket.transaction_id));
    lines.join("\n")
}

fn pair(left: &str, right: &str) -> String {
    let pad = WIDTH.saturating_sub(left.chars().count() + right.chars().count()).max(1);
    format!("{left}{}{right}", " ".repeat(pad))
}
