#[cfg(test)]
mod tests {
    use store::entities::*;

    fn ts() -> chrono::NaiveDateTime {
        chrono::DateTime::from_timestamp(1640995200, 0).unwrap().naive_utc()
    }

    #[test]
    fn test_product_entity_creation() {
        let product = product::Model {
            id: 1,
            name: "Desk Lamp".to_string(),
            price: 29.99,
            stock: 40,
            created_at: ts(),
        };

        assert_eq!(product.id, 1);
        assert_eq!(product.name, "Desk Lamp");
        assert_eq!(product.stock, 40);
    }

    #[test]
    fn test_order_entity_creation() {
        let order = order::Model {
            id: 1,
            user_id: 100,
            shipping_address_id: 5,
            billing_address_id: None,
            payment_method: "Card".to_string(),
            payment_transaction_id: Some("ch_123".to_string()),
            payment_status: "Paid".to_string(),
            paid_at: Some(ts()),
            items_price: 59.98,
            tax_price: 6.0,
            shipping_price: 10.0,
            discount_price: 0.0,
            total_price: 75.98,
            status: "Pending".to_string(),
            courier: None,
            tracking_number: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            order_notes: Some("Leave at the door".to_string()),
            updated_by: None,
            deleted: false,
            deleted_at: None,
            created_at: ts(),
            updated_at: ts(),
        };

        assert_eq!(order.id, 1);
        assert_eq!(order.status, "Pending");
        assert_eq!(order.total_price, 75.98);
        assert!(!order.deleted);
    }

    #[test]
    fn test_order_item_entity_creation() {
        let item = order_item::Model {
            id: 1,
            order_id: 1,
            product_id: 3,
            quantity: 2,
            unit_price: 29.99,
            item_status: "Pending".to_string(),
            pre_order: false,
            available_on: None,
        };

        assert_eq!(item.order_id, 1);
        assert_eq!(item.product_id, 3);
        assert_eq!(item.quantity, 2);
        assert_eq!(item.unit_price, 29.99);
    }

    #[test]
    fn test_address_entity_creation() {
        let address = address::Model {
            id: 1,
            user_id: 100,
            line1: "123 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
            is_default: true,
            created_at: ts(),
        };

        assert_eq!(address.user_id, 100);
        assert!(address.is_default);
    }

    #[test]
    fn test_entity_serialization() {
        let product = product::Model {
            id: 7,
            name: "Mug".to_string(),
            price: 9.5,
            stock: 12,
            created_at: ts(),
        };

        let json = serde_json::to_string(&product).unwrap();
        let back: product::Model = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 7);
        assert_eq!(back.name, "Mug");
    }
}
