use serde::Serialize;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Block {
    Left,
    Right,
}

impl Block {
    pub fn as_str(&self) -> &'static str {
        match self {
            Block::Left => "left",
            Block::Right => "right",
        }
    }
}

impl FromStr for Block {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Block::Left),
            "right" => Ok(Block::Right),
            other => Err(ParseEnumError::new("block", other)),
        }
    }
}

/// Категория места. VIP места не предлагаются в публичном бронировании.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Regular,
    Vip,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Regular => "regular",
            Category::Vip => "vip",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(Category::Regular),
            "vip" => Ok(Category::Vip),
            other => Err(ParseEnumError::new("category", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Seat {
    pub id: i64,
    pub seat_number: String,
    pub block: Block,
    pub row_number: i32,
    pub seat_index: i32,
    pub category: Category,
}

impl Seat {
    pub fn is_vip(&self) -> bool {
        self.category == Category::Vip
    }
}

// Строка таблицы seats как она лежит в БД
#[derive(Debug, FromRow)]
pub struct SeatRow {
    pub id: i64,
    pub seat_number: String,
    pub block: String,
    pub row_number: i32,
    pub seat_index: i32,
    pub category: String,
}

impl TryFrom<SeatRow> for Seat {
    type Error = ParseEnumError;

    fn try_from(row: SeatRow) -> Result<Self, Self::Error> {
        Ok(Seat {
            id: row.id,
            seat_number: row.seat_number,
            block: row.block.parse()?,
            row_number: row.row_number,
            seat_index: row.seat_index,
            category: row.category.parse()?,
        })
    }
}
