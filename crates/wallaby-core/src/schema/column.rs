/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInteger,
    /// Double precision float
    Float,
    /// Fixed-point decimal
    Decimal { max_digits: u32, decimal_places: u32 },
    Text,
    Boolean,
    /// UTC instant
    Timestamp,
    /// Semi-structured JSON document
    Json,
    Binary,
}

impl ColumnType {
    /// Fractional digits kept in storage, for decimal columns
    pub const fn decimal_places(self) -> Option<u32> {
        match self {
            ColumnType::Decimal { decimal_places, .. } => Some(decimal_places),
            _ => None,
        }
    }
}

/// `decimal(65535, 12)`, the type of every pipeline measurement
pub const MEASUREMENT: ColumnType = ColumnType::Decimal {
    max_digits: 65535,
    decimal_places: 12,
};

/// Action taken on referencing rows when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Referencing column becomes NULL
    SetNull,
    /// Deletion is rejected while referencing rows exist
    NoAction,
}

impl OnDelete {
    /// SQL keyword phrase for this policy
    pub fn as_sql(&self) -> &'static str {
        match self {
            OnDelete::SetNull => "SET NULL",
            OnDelete::NoAction => "NO ACTION",
        }
    }
}

/// Foreign key target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub table: &'static str,
    pub column: &'static str,
    pub on_delete: OnDelete,
}

/// A single column declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub max_length: Option<u32>,
    pub primary_key: bool,
    pub references: Option<Reference>,
    /// Value is stamped with the current time on every save
    pub auto_now: bool,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            max_length: None,
            primary_key: false,
            references: None,
            auto_now: false,
        }
    }

    /// Surrogate identity column
    pub const fn identity(name: &'static str, ty: ColumnType) -> Self {
        Self {
            primary_key: true,
            ..Self::new(name, ty)
        }
    }

    /// Foreign key column pointing at `table.id`
    pub const fn foreign_key(
        name: &'static str,
        ty: ColumnType,
        table: &'static str,
        on_delete: OnDelete,
    ) -> Self {
        Self {
            references: Some(Reference {
                table,
                column: "id",
                on_delete,
            }),
            ..Self::new(name, ty)
        }
    }

    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    pub const fn max_length(self, max: u32) -> Self {
        Self {
            max_length: Some(max),
            ..self
        }
    }

    pub const fn auto_now(self) -> Self {
        Self {
            auto_now: true,
            ..self
        }
    }

    /// High-precision decimal used for every pipeline measurement
    pub const fn measurement(name: &'static str) -> Self {
        Self::new(name, MEASUREMENT)
    }
}
