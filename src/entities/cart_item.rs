use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest quantity a single line may hold.
pub const MAX_QUANTITY: i32 = 9_999;

/// Cart line. Absent size/color are stored as `""` so the
/// `(cart_id, product_id, size, color)` unique index treats them as equal.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn variant(&self) -> Variant {
        Variant::from_columns(&self.size, &self.color)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cart::Entity",
        from = "Column::CartId",
        to = "super::cart::Column::Id",
        on_delete = "Cascade"
    )]
    Cart,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Size/color selection of a product. Blank selectors count as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Variant {
    pub size: Option<String>,
    pub color: Option<String>,
}

impl Variant {
    pub fn new(size: Option<String>, color: Option<String>) -> Self {
        let normalize = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            size: normalize(size),
            color: normalize(color),
        }
    }

    pub fn from_columns(size: &str, color: &str) -> Self {
        Self::new(Some(size.to_string()), Some(color.to_string()))
    }

    pub fn size_column(&self) -> &str {
        self.size.as_deref().unwrap_or("")
    }

    pub fn color_column(&self) -> &str {
        self.color.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_selectors_are_absent() {
        let variant = Variant::new(Some("  ".into()), None);
        assert_eq!(variant, Variant::default());
        assert_eq!(variant.size_column(), "");
    }

    #[test]
    fn columns_round_trip_through_variant() {
        let variant = Variant::new(Some("M".into()), Some("red".into()));
        let restored = Variant::from_columns(variant.size_column(), variant.color_column());
        assert_eq!(restored, variant);
    }
}
