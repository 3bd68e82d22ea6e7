//! Parsed spreadsheet rows
//!
//! One struct per sheet type, fields mirror the stored columns. Parsing from
//! workbook cells happens in [`crate::ingest`]; these types only carry data.

use serde::Serialize;

/// One pre-alerta manifest row keyed by tracking number
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreAlertaRecord {
    pub tracking_number: String,
    pub client: Option<String>,
    pub country: Option<String>,
    pub weight: Option<f64>,
    pub value: Option<f64>,
    pub buyer_normalized_id: Option<String>,
    pub buyer: Option<String>,
    pub buyer_address1: Option<String>,
    pub buyer_address1_number: Option<String>,
    pub buyer_address2: Option<String>,
    pub buyer_city: Option<String>,
    pub buyer_state: Option<String>,
    pub buyer_location: Option<String>,
    pub buyer_zip: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_email: Option<String>,
    /// Original row serialized as JSON, kept for audit
    pub raw_data: Option<String>,
}

/// One pre-ruteo route plan row keyed by codigo de pedido
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreRuteoRecord {
    pub codigo_cliente: Option<String>,
    pub razon_social: Option<String>,
    pub domicilio: Option<String>,
    pub tipo_cliente: Option<String>,
    pub fecha_reparto: Option<String>,
    pub codigo_reparto: Option<String>,
    pub maquina: Option<String>,
    pub chofer: Option<String>,
    pub fecha_pedido: Option<String>,
    pub codigo_pedido: String,
    pub ventana_horaria: Option<String>,
    pub arribo: Option<String>,
    pub partida: Option<String>,
    pub peso_kg: Option<f64>,
    pub volumen_m3: Option<f64>,
    pub dinero: Option<f64>,
    pub raw_data: Option<String>,
}
