//! `odk tickets ...`

use std::sync::Arc;

use anyhow::Result;
use odk_client::TicketService;
use odk_schemas::SupportTicket;
use odk_workflow::display::{format_amount, short_id};
use odk_workflow::tickets::{status_tally, total_amount};
use odk_workflow::TicketDesk;

use crate::TicketsCmd;

pub async fn run<S>(cmd: TicketsCmd, svc: Arc<S>) -> Result<()>
where
    S: TicketService + ?Sized,
{
    let desk = TicketDesk::new(svc);

    match cmd {
        TicketsCmd::List { status } => {
            let tickets = desk.list(status).await?;
            for t in &tickets {
                println!("{}", ticket_row(t));
            }
            let tally = status_tally(&tickets)
                .into_iter()
                .map(|(s, n)| format!("{s}={n}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("tickets={} {}", tickets.len(), tally);
        }

        TicketsCmd::Show { ticket_id } => {
            let t = desk.open(&ticket_id).await?;
            print_ticket(&t);
        }

        TicketsCmd::ForOrder { order_id } => {
            let tickets = desk.for_order(&order_id).await?;
            for t in &tickets {
                println!("{}", ticket_row(t));
            }
            println!(
                "tickets={} total_amount={}",
                tickets.len(),
                format_amount(total_amount(&tickets))
            );
        }

        TicketsCmd::SetStatus {
            ticket_id,
            status,
            notes,
        } => {
            let t = desk.set_status(&ticket_id, status, &notes).await?;
            println!("Ticket status updated to {}", t.status);
            print_ticket(&t);
        }

        TicketsCmd::Stats => {
            let stats = desk.stats().await?;
            if let Some(err) = &stats.error {
                anyhow::bail!("ticket stats unavailable: {err}");
            }
            println!("total_tickets={}", stats.total_tickets);
            for (status, bucket) in &stats.by_status {
                println!(
                    "{status} count={} avg_amount={}",
                    bucket.count,
                    format_amount(bucket.avg_amount)
                );
            }
            if let Some(at) = &stats.generated_at {
                println!("generated_at={at}");
            }
        }
    }

    Ok(())
}

fn ticket_row(t: &SupportTicket) -> String {
    format!(
        "{}  {:<11}  {:>12}  order={}  {}",
        short_id(&t.id),
        t.status.as_str(),
        format_amount(t.amount),
        short_id(&t.order_id),
        t.reason
    )
}

fn print_ticket(t: &SupportTicket) {
    println!("ticket_id={}", t.id);
    println!("order_id={}", t.order_id);
    println!("status={}", t.status);
    println!("amount={}", format_amount(t.amount));
    println!("reason={}", t.reason);
    println!("created_at={}", t.created_at.to_rfc3339());
    for (k, v) in &t.metadata {
        println!("metadata.{k}={}", v.render());
    }
}
