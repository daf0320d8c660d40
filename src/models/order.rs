use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::customer::Customer;
use crate::models::money::Money;

/// Coarse delivery progress. Serialized as its stable integer code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum OrderStatus {
    NotReceived,
    ReceivedNotShipped,
    ReceivedShipping,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::NotReceived,
        OrderStatus::ReceivedNotShipped,
        OrderStatus::ReceivedShipping,
        OrderStatus::Delivered,
    ];

    pub fn code(self) -> u8 {
        match self {
            OrderStatus::NotReceived => 0,
            OrderStatus::ReceivedNotShipped => 1,
            OrderStatus::ReceivedShipping => 2,
            OrderStatus::Delivered => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::NotReceived => "not_received",
            OrderStatus::ReceivedNotShipped => "received_not_shipped",
            OrderStatus::ReceivedShipping => "received_shipping",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl TryFrom<u8> for OrderStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OrderStatus::NotReceived),
            1 => Ok(OrderStatus::ReceivedNotShipped),
            2 => Ok(OrderStatus::ReceivedShipping),
            3 => Ok(OrderStatus::Delivered),
            other => Err(format!("unknown order status code {other}")),
        }
    }
}

impl From<OrderStatus> for u8 {
    fn from(status: OrderStatus) -> Self {
        status.code()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Standard,
    Fast,
    BankTransfer,
    Online,
}

impl PaymentMethod {
    /// Methods settled before pickup; orders using them start out paid.
    pub fn is_prepaid(self) -> bool {
        matches!(
            self,
            PaymentMethod::Fast | PaymentMethod::BankTransfer | PaymentMethod::Online
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Standard => "standard",
            PaymentMethod::Fast => "fast",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Online => "online",
        }
    }
}

impl TryFrom<u8> for PaymentMethod {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PaymentMethod::Standard),
            1 => Ok(PaymentMethod::Fast),
            2 => Ok(PaymentMethod::BankTransfer),
            3 => Ok(PaymentMethod::Online),
            other => Err(format!("unknown payment method code {other}")),
        }
    }
}

impl From<PaymentMethod> for u8 {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Standard => 0,
            PaymentMethod::Fast => 1,
            PaymentMethod::BankTransfer => 2,
            PaymentMethod::Online => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum DeliveryType {
    Standard,
    Express,
}

impl DeliveryType {
    pub const ALL: [DeliveryType; 2] = [DeliveryType::Standard, DeliveryType::Express];

    pub fn label(self) -> &'static str {
        match self {
            DeliveryType::Standard => "standard",
            DeliveryType::Express => "express",
        }
    }
}

impl TryFrom<u8> for DeliveryType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DeliveryType::Standard),
            1 => Ok(DeliveryType::Express),
            other => Err(format!("unknown delivery type code {other}")),
        }
    }
}

impl From<DeliveryType> for u8 {
    fn from(kind: DeliveryType) -> Self {
        match kind {
            DeliveryType::Standard => 0,
            DeliveryType::Express => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum PackageType {
    SmallParcel,
    WrappedParcel,
    Wrap,
    Sack,
    Carton,
    PbSack,
    CartonBox,
    Tv,
    Laptop,
    Computer,
    Cpu,
    Vehicle,
}

impl PackageType {
    pub const ALL: [PackageType; 12] = [
        PackageType::SmallParcel,
        PackageType::WrappedParcel,
        PackageType::Wrap,
        PackageType::Sack,
        PackageType::Carton,
        PackageType::PbSack,
        PackageType::CartonBox,
        PackageType::Tv,
        PackageType::Laptop,
        PackageType::Computer,
        PackageType::Cpu,
        PackageType::Vehicle,
    ];

    pub fn code(self) -> u8 {
        match self {
            PackageType::SmallParcel => 0,
            PackageType::WrappedParcel => 1,
            PackageType::Wrap => 2,
            PackageType::Sack => 3,
            PackageType::Carton => 4,
            PackageType::PbSack => 5,
            PackageType::CartonBox => 6,
            PackageType::Tv => 7,
            PackageType::Laptop => 8,
            PackageType::Computer => 9,
            PackageType::Cpu => 10,
            PackageType::Vehicle => 11,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PackageType::SmallParcel => "small_parcel",
            PackageType::WrappedParcel => "wrapped_parcel",
            PackageType::Wrap => "wrap",
            PackageType::Sack => "sack",
            PackageType::Carton => "carton",
            PackageType::PbSack => "pb_sack",
            PackageType::CartonBox => "box",
            PackageType::Tv => "tv",
            PackageType::Laptop => "laptop",
            PackageType::Computer => "computer",
            PackageType::Cpu => "cpu",
            PackageType::Vehicle => "vehicle",
        }
    }
}

impl TryFrom<u8> for PackageType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PackageType::ALL
            .into_iter()
            .find(|kind| kind.code() == value)
            .ok_or_else(|| format!("unknown package type code {value}"))
    }
}

impl From<PackageType> for u8 {
    fn from(kind: PackageType) -> Self {
        kind.code()
    }
}

/// The goods attributes that drive pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsDescriptor {
    pub product_code: String,
    pub package_type: PackageType,
    pub weight_kg: f64,
    pub size: String,
    pub distance_km: f64,
    pub is_fragile: bool,
    pub is_valuable: bool,
    pub is_vehicle: bool,
    pub delivery_type: DeliveryType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteLine {
    pub at: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOrder {
    pub id: Uuid,
    pub order_code: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub customer_id: Uuid,
    pub customer: Customer,
    pub goods: GoodsDescriptor,
    pub collect_money: bool,
    pub collection_amount: Money,
    pub payment_method: PaymentMethod,
    pub shipping_fee: Money,
    pub is_paid: bool,
    pub paid_amount: Option<Money>,
    pub payment_time: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub assigned_staff_id: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
    pub delivery_started_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Vec<NoteLine>,
    pub confirmed_received: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl DeliveryOrder {
    pub fn is_created_by(&self, user_id: Uuid) -> bool {
        self.created_by == Some(user_id)
    }
}
