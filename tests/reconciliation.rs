// tests/reconciliation.rs

mod common;

use assert_matches::assert_matches;
use common::{item, requestor, reviewer, Harness};
use lab_requisitions::{
    common::error::AppError,
    db::InventoryCatalog,
    models::{
        audit::actions,
        auth::Actor,
        borrow::{ApprovePayload, ApprovedSelection, ReturnEntry, ReturnItemsPayload, SelectionStatus},
    },
};
use uuid::Uuid;

fn returning(item_id: Uuid, quantity: i32, condition: &str) -> ReturnItemsPayload {
    ReturnItemsPayload {
        returns: vec![ReturnEntry {
            item_id,
            quantity,
            condition: condition.to_string(),
        }],
    }
}

/// Seleção aprovada com as quantidades dadas; devolve também o custodiante.
async fn approved(h: &Harness, quantities: &[i32]) -> (ApprovedSelection, Actor) {
    let alice = requestor("Alice");
    let custodian = reviewer("Custodian");
    let items: Vec<_> = quantities
        .iter()
        .enumerate()
        .map(|(i, _)| item(&format!("Slide {}", i), &format!("GLS-{:03}", i)))
        .collect();
    let cart: Vec<_> = items.iter().zip(quantities).map(|(it, q)| (it, *q)).collect();
    h.fill_cart(&alice, &cart).await;
    let requisition = h.submit(&alice).await;

    let outcome = h
        .state
        .approval_service
        .approve(
            &custodian,
            requisition.id,
            ApprovePayload {
                selected_item_ids: items.iter().map(|i| i.id).collect(),
                selection_id: None,
            },
        )
        .await
        .unwrap();
    (outcome.selection, custodian)
}

async fn borrowed(h: &Harness, quantities: &[i32]) -> (ApprovedSelection, Actor) {
    let (selection, custodian) = approved(h, quantities).await;
    let selection = h
        .state
        .reconciliation_service
        .mark_borrowed(&custodian, selection.id)
        .await
        .unwrap();
    (selection, custodian)
}

#[tokio::test]
async fn partial_returns_close_the_selection_only_when_everything_is_back() {
    let h = Harness::new();
    let (selection, custodian) = borrowed(&h, &[5]).await;
    let slide = selection.approved_lines[0].line.inventory_item_id;
    let service = &h.state.reconciliation_service;

    let first = service
        .return_items(&custodian, selection.id, returning(slide, 3, "Good"))
        .await
        .unwrap();
    assert_eq!(first.selection.status, SelectionStatus::Borrowed);
    assert_eq!(first.outstanding[&slide], 2);
    assert_eq!(first.records.len(), 1);

    // Devolver mais do que falta não muda nada
    let over = service
        .return_items(&custodian, selection.id, returning(slide, 3, "Good"))
        .await;
    assert_matches!(over, Err(AppError::OverReturn { requested: 3, outstanding: 2, .. }));
    assert_eq!(service.list_returns(selection.id).await.unwrap().len(), 1);

    let last = service
        .return_items(&custodian, selection.id, returning(slide, 2, "Damaged"))
        .await
        .unwrap();
    assert_eq!(last.selection.status, SelectionStatus::Returned);
    assert_eq!(last.outstanding[&slide], 0);
    assert!(last.selection.returned_at.is_some());

    let records = service.list_returns(selection.id).await.unwrap();
    let total: i32 = records.iter().map(|r| r.returned_quantity).sum();
    assert_eq!(total, 5);

    let closed = service
        .return_items(&custodian, selection.id, returning(slide, 1, "Good"))
        .await;
    assert_matches!(closed, Err(AppError::InvalidState { action: "return items", .. }));
}

#[tokio::test]
async fn one_line_back_is_not_enough_to_close() {
    let h = Harness::new();
    let (selection, custodian) = borrowed(&h, &[1, 2]).await;
    let first = selection.approved_lines[0].line.inventory_item_id;

    let outcome = h
        .state
        .reconciliation_service
        .return_items(&custodian, selection.id, returning(first, 1, "Good"))
        .await
        .unwrap();
    assert_eq!(outcome.selection.status, SelectionStatus::Borrowed);
}

#[tokio::test]
async fn returns_require_a_borrowed_selection() {
    let h = Harness::new();
    let (selection, custodian) = approved(&h, &[2]).await;
    let slide = selection.approved_lines[0].line.inventory_item_id;

    let early = h
        .state
        .reconciliation_service
        .return_items(&custodian, selection.id, returning(slide, 1, "Good"))
        .await;
    assert_matches!(early, Err(AppError::InvalidState { .. }));
}

#[tokio::test]
async fn marking_borrowed_twice_is_a_no_op() {
    let h = Harness::new();
    let (selection, custodian) = approved(&h, &[1]).await;
    let service = &h.state.reconciliation_service;

    let once = service.mark_borrowed(&custodian, selection.id).await.unwrap();
    let twice = service.mark_borrowed(&custodian, selection.id).await.unwrap();
    assert_eq!(once.status, SelectionStatus::Borrowed);
    assert_eq!(twice.version, once.version);
    assert_eq!(twice.borrowed_at, once.borrowed_at);

    let borrowed_entries = h
        .state
        .audit_service
        .activity(selection.requestor_id, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.action == actions::BORROWED)
        .count();
    assert_eq!(borrowed_entries, 1);
}

#[tokio::test]
async fn returned_selection_cannot_be_borrowed_again() {
    let h = Harness::new();
    let (selection, custodian) = borrowed(&h, &[1]).await;
    let slide = selection.approved_lines[0].line.inventory_item_id;
    let service = &h.state.reconciliation_service;
    service
        .return_items(&custodian, selection.id, returning(slide, 1, "Good"))
        .await
        .unwrap();

    let again = service.mark_borrowed(&custodian, selection.id).await;
    assert_matches!(again, Err(AppError::InvalidState { action: "mark borrowed", .. }));
}

#[tokio::test]
async fn blank_condition_and_foreign_items_are_refused() {
    let h = Harness::new();
    let (selection, custodian) = borrowed(&h, &[2]).await;
    let slide = selection.approved_lines[0].line.inventory_item_id;
    let service = &h.state.reconciliation_service;

    let blank = service
        .return_items(&custodian, selection.id, returning(slide, 1, "   "))
        .await;
    assert_matches!(blank, Err(AppError::MissingField { field: "condition" }));

    let foreign = service
        .return_items(&custodian, selection.id, returning(Uuid::new_v4(), 1, "Good"))
        .await;
    assert_matches!(foreign, Err(AppError::ItemNotInSelection { .. }));

    let empty = service
        .return_items(&custodian, selection.id, ReturnItemsPayload { returns: vec![] })
        .await;
    assert_matches!(empty, Err(AppError::MissingField { field: "returns" }));

    assert!(service.list_returns(selection.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn returned_condition_reaches_the_catalog() {
    let h = Harness::new();
    let (selection, custodian) = borrowed(&h, &[1]).await;
    let slide = selection.approved_lines[0].line.inventory_item_id;

    h.state
        .reconciliation_service
        .return_items(&custodian, selection.id, returning(slide, 1, "Damaged"))
        .await
        .unwrap();

    let stored = h.store.inner.find_item(slide).await.unwrap().unwrap();
    assert_eq!(stored.condition, "Damaged");
}

#[tokio::test]
async fn each_return_event_is_one_history_entry() {
    let h = Harness::new();
    let (selection, custodian) = borrowed(&h, &[2, 3]).await;
    let a = selection.approved_lines[0].line.inventory_item_id;
    let b = selection.approved_lines[1].line.inventory_item_id;

    let payload = ReturnItemsPayload {
        returns: vec![
            ReturnEntry { item_id: a, quantity: 2, condition: "Good".into() },
            ReturnEntry { item_id: b, quantity: 1, condition: "Good".into() },
        ],
    };
    h.state
        .reconciliation_service
        .return_items(&custodian, selection.id, payload)
        .await
        .unwrap();

    let history = h
        .state
        .audit_service
        .activity(selection.requestor_id, None)
        .await
        .unwrap();
    assert_eq!(history[0].action, actions::RETURNED);
    assert_eq!(history[0].related_lines.len(), 2);
    assert_eq!(history[0].related_lines[0].label, "Slide 0");
    assert_eq!(history[0].related_lines[0].condition.as_deref(), Some("Good"));
}

#[tokio::test]
async fn unknown_selection_is_not_found() {
    let h = Harness::new();
    let custodian = reviewer("Custodian");
    let service = &h.state.reconciliation_service;

    assert_matches!(
        service.mark_borrowed(&custodian, Uuid::new_v4()).await,
        Err(AppError::SelectionNotFound)
    );
    assert_matches!(service.list_returns(Uuid::new_v4()).await, Err(AppError::SelectionNotFound));
}
