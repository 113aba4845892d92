//! `odk orders ...`

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use odk_client::OrderService;
use odk_schemas::{EventKind, Order};
use odk_workflow::display::{
    customer_info, format_amount, history_line, short_id, state_badge, FINAL_STATE_MESSAGE,
    NO_ACTIONS_TITLE,
};
use odk_workflow::reconcile::ORDER_NOT_FOUND;
use odk_workflow::{
    catalog, ConfirmationInput, CreateOrderDraft, OrderDetailView, Selection, SubmitOutcome,
    WorkflowSettings,
};

use super::{is_yes, print_notices, prompt_line};
use crate::OrdersCmd;

pub async fn run<S>(cmd: OrdersCmd, svc: Arc<S>, settings: &WorkflowSettings) -> Result<()>
where
    S: OrderService + ?Sized,
{
    match cmd {
        OrdersCmd::List => {
            let orders = svc
                .list_orders()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to fetch orders: {}", e.user_message()))?;
            for o in &orders {
                println!("{}", order_row(o));
            }
            println!("orders={}", orders.len());
        }

        OrdersCmd::Show { order_id } => {
            let mut view = OrderDetailView::new(svc, order_id, settings);
            load_or_bail(&mut view).await?;
            print_detail(&view);
        }

        OrdersCmd::History { order_id } => {
            let history = svc.history(&order_id).await.map_err(|e| {
                if e.is_not_found() {
                    anyhow::anyhow!(ORDER_NOT_FOUND)
                } else {
                    anyhow::anyhow!("Failed to fetch order history: {}", e.user_message())
                }
            })?;
            for ev in &history.events {
                println!("{}", history_line(ev));
            }
            println!("total_events={}", history.total_events);
        }

        OrdersCmd::Create {
            products,
            amount,
            customer_name,
            customer_email,
            notes,
            priority,
            source,
        } => {
            let mut draft = CreateOrderDraft::new();
            for p in &products {
                draft.add_product(p)?;
            }
            draft.amount = amount;
            draft.customer_name = customer_name.unwrap_or_default();
            draft.customer_email = customer_email.unwrap_or_default();
            draft.notes = notes.unwrap_or_default();
            draft.priority = Some(priority);
            if let Some(s) = source {
                draft.source = s;
            }

            let req = draft.into_request(&settings.channel, Utc::now())?;
            let order = svc
                .create_order(&req)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create order: {}", e.user_message()))?;
            println!("order_id={}", order.id);
            println!("state={}", order.state);
            println!("amount={}", format_amount(order.amount));
        }

        OrdersCmd::Event {
            order_id,
            kind,
            reason,
            notes,
            yes,
        } => {
            let mut view = OrderDetailView::new(svc, order_id, settings);
            load_or_bail(&mut view).await?;
            view.take_notices();

            let selection = view
                .select_event(kind)
                .await
                .context("event selection refused")?;

            let outcome = match selection {
                Selection::NotOffered(kind) => {
                    let state = view.order().map(|o| o.state.to_string()).unwrap_or_default();
                    bail!(
                        "event {} is not allowed for order {} in state {}",
                        kind,
                        view.order_id(),
                        state
                    );
                }
                Selection::Submitted(outcome) => outcome,
                Selection::ConfirmationOpened(kind) => {
                    let input = if yes {
                        ConfirmationInput::new(
                            reason.as_deref().unwrap_or_default(),
                            notes.as_deref().unwrap_or_default(),
                        )
                    } else {
                        match collect_confirmation(kind, reason, notes)? {
                            Some(input) => input,
                            None => {
                                view.cancel_confirmation()?;
                                println!("cancelled=true event={kind}");
                                return Ok(());
                            }
                        }
                    };
                    view.confirm(input).await?
                }
            };

            match outcome {
                SubmitOutcome::Accepted(acc) => {
                    print_notices(&view.take_notices());
                    println!("event_accepted=true");
                    println!("order_id={}", acc.order_id);
                    println!("old_state={}", acc.old_state);
                    println!("new_state={}", acc.new_state);
                }
                SubmitOutcome::NotFound { .. } => bail!(ORDER_NOT_FOUND),
                SubmitOutcome::Failed { message } => bail!(message),
                SubmitOutcome::Dropped => bail!("another submission is already in flight"),
            }
        }
    }

    Ok(())
}

async fn load_or_bail<S>(view: &mut OrderDetailView<S>) -> Result<()>
where
    S: OrderService + ?Sized,
{
    if let Err(e) = view.load().await {
        bail!(e.user_message());
    }
    Ok(())
}

fn order_row(o: &Order) -> String {
    let info = customer_info(o);
    format!(
        "{}  {:<16}  {:>12}  {}",
        short_id(&o.id),
        state_badge(o.state),
        format_amount(o.amount),
        info.name.unwrap_or("-")
    )
}

fn print_detail<S: OrderService + ?Sized>(view: &OrderDetailView<S>) {
    let Some(order) = view.order() else {
        return;
    };
    let info = customer_info(order);

    println!("order_id={}", order.id);
    println!("state={} ({})", order.state, order.state.label());
    println!("amount={}", format_amount(order.amount));
    println!("products={}", order.product_ids.join(","));
    if let Some(name) = info.name {
        println!("customer_name={name}");
    }
    if let Some(email) = info.email {
        println!("customer_email={email}");
    }
    if let Some(priority) = info.priority {
        println!("priority={priority}");
    }
    if let Some(notes) = info.notes {
        println!("notes={notes}");
    }
    println!("updated_at={}", order.updated_at.to_rfc3339());

    print_notices(view.notices());

    let allowed = view.allowed_events();
    if allowed.is_empty() {
        println!("{NO_ACTIONS_TITLE}: {FINAL_STATE_MESSAGE}");
        return;
    }
    println!("allowed_events:");
    for kind in allowed {
        let p = catalog::profile(*kind);
        let flag = if p.requires_confirmation { " [confirm]" } else { "" };
        println!("  {:<34} {}{}", kind.as_str(), p.label, flag);
    }
}

/// Interactive reason/notes collection. `None` means the operator declined.
fn collect_confirmation(
    kind: EventKind,
    reason: Option<String>,
    notes: Option<String>,
) -> Result<Option<ConfirmationInput>> {
    let p = catalog::profile(kind);
    println!("{}: {}", p.label, p.description);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let reason = match reason {
        Some(r) => r,
        None => prompt_line(&mut input, "Reason (optional): ")?,
    };
    let notes = match notes {
        Some(n) => n,
        None => prompt_line(&mut input, "Notes (optional): ")?,
    };
    let answer = prompt_line(&mut input, &format!("Submit {}? [y/N]: ", p.label))?;
    println!();

    if is_yes(&answer) {
        Ok(Some(ConfirmationInput::new(reason, notes)))
    } else {
        Ok(None)
    }
}
