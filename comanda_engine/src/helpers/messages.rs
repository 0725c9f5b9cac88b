use crate::db_types::Order;

/// The text sent to a customer when their order leaves the store.
pub fn compose_delivery_message(order: &Order) -> String {
    let mut message = format!("🛵 Olá, {}! Seu pedido #{} saiu para entrega.", order.customer_name.trim(), order.display_id);
    if let Some(address) = order.delivery_address() {
        message.push_str(&format!("\n📍 Endereço: {address}"));
    }
    message.push_str("\nObrigado pela preferência!");
    message
}
