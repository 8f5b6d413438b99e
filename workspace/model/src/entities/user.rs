use sea_orm::entity::prelude::*;

/// Represents a registered user of the system.
/// Every transaction row is exclusively owned by one user.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Stored trimmed and lowercased; uniqueness is enforced by the schema.
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string. Never serialized into API responses.
    pub password_hash: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    // A user owns many transactions; deleting the user removes them.
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transaction,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
