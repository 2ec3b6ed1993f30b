//! Context handed to the reply generator
//!
//! The core never produces customer-facing prose. It builds a [`ReplyContext`]
//! with the order and table state rendered as text, and the caller passes that
//! to whatever [`DialogueGenerator`] it uses (typically an LLM call).

use std::fmt::Write as _;

use async_trait::async_trait;
use comanda_types::MenuItem;
use serde::Serialize;

use crate::intent::Intent;
use crate::order::Order;
use crate::session::{Session, Stage};

pub const EMPTY_ORDER_TEXT: &str = "Pedido vazio";

/// Text the generator needs to phrase a reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyContext {
    pub stage: Stage,
    pub intent: Intent,
    pub utterance: String,
    pub customer_name: Option<String>,
    pub table_context: String,
    pub order_summary: String,
    pub menu: String,
}

impl ReplyContext {
    pub fn build(session: &Session, intent: Intent, utterance: &str, menu: &[MenuItem]) -> Self {
        Self {
            stage: session.stage(),
            intent,
            utterance: utterance.to_string(),
            customer_name: session.customer.name.clone(),
            table_context: format_table_context(session.table_number, session.party_size),
            order_summary: format_order_summary(session.order()),
            menu: format_menu(menu),
        }
    }

    /// Flat key/value rendering for prompt templates
    pub fn to_prompt_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "ETAPA: {}", self.stage);
        let _ = writeln!(out, "MESA: {}", self.table_context);
        if let Some(name) = &self.customer_name {
            let _ = writeln!(out, "CLIENTE: {}", name);
        }
        let _ = writeln!(out, "MENSAGEM: {}", self.utterance);
        let _ = writeln!(out, "\n{}", self.order_summary);
        let _ = write!(out, "\nCARDAPIO:{}", self.menu);
        out
    }
}

/// Produces the reply text for a turn. Opaque to the core.
#[async_trait]
pub trait DialogueGenerator: Send + Sync {
    async fn generate(&self, context: &ReplyContext) -> anyhow::Result<String>;
}

/// "PEDIDO ATUAL:" with one bullet per line and the total, or [`EMPTY_ORDER_TEXT`].
pub fn format_order_summary(order: &Order) -> String {
    if order.is_empty() {
        return EMPTY_ORDER_TEXT.to_string();
    }

    let mut out = String::from("PEDIDO ATUAL:\n");
    for line in order.lines() {
        let _ = writeln!(out, "• {}", line);
    }
    if let Some(notes) = order.special_instructions() {
        let _ = writeln!(out, "Obs: {}", notes);
    }
    let _ = write!(out, "\nTOTAL: R$ {:.2}", order.total());
    out
}

pub fn format_table_context(table_number: Option<u32>, party_size: Option<u32>) -> String {
    let party = party_size.map(|n| {
        if n == 1 {
            "1 pessoa".to_string()
        } else {
            format!("{} pessoas", n)
        }
    });

    match (table_number, party) {
        (Some(table), Some(party)) => format!("Mesa {} - {}", table, party),
        (Some(table), None) => format!("Mesa {}", table),
        (None, Some(party)) => party,
        (None, None) => "Mesa e pessoas não informadas".to_string(),
    }
}

/// Menu grouped by category, categories in first-seen order.
pub fn format_menu(items: &[MenuItem]) -> String {
    let mut categories: Vec<(&str, Vec<&MenuItem>)> = Vec::new();
    for item in items {
        match categories.iter_mut().find(|(c, _)| *c == item.category) {
            Some((_, group)) => group.push(item),
            None => categories.push((item.category.as_str(), vec![item])),
        }
    }

    let mut out = String::new();
    for (category, group) in categories {
        let _ = writeln!(out, "\n{}:", category.to_uppercase());
        for item in group {
            let _ = writeln!(out, "• {} - R$ {:.2}", item.name, item.price);
        }
    }
    out
}
