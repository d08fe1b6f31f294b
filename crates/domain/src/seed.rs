//! Demo fixture data for a fresh store.
//!
//! Each table is filled only when it is empty, so running the seed against a
//! store that already has data is harmless. Fixtures bypass form validation.

use common::{AccountClass, Money, OrderNumber, ProductCode, Run, ShipmentStatus};
use serde::Serialize;
use store::{Account, NewOrderLine, Order, Product, Store};

use crate::credentials::Credentials;
use crate::error::Result;

/// Rows written by [`seed_if_empty`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub products: usize,
    pub accounts: usize,
    pub orders: usize,
    pub lines: usize,
}

impl SeedReport {
    /// Returns true if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.products == 0 && self.accounts == 0 && self.orders == 0
    }
}

// code, category, name, description, price, stock, critical stock, image
type ProductRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    i64,
    i64,
    i64,
    &'static str,
);

#[rustfmt::skip]
const PRODUCTS: [ProductRow; 10] = [
    ("AC001", "Accesorios", "Llavero Stardew Valley", "Llavero temático de Stardew Valley, perfecto para llevar contigo a todas partes.", 5990, 76, 30, "llavero_stardew"),
    ("AC002", "Accesorios", "Taza Stardew Valley", "Taza de cerámica con diseño exclusivo de Stardew Valley, ideal para tu bebida favorita.", 7990, 48, 20, "taza_stardew_valley"),
    ("AC003", "Accesorios", "Pins Stardew Valley", "Set de pins coleccionables con personajes y elementos de Stardew Valley.", 2500, 162, 100, "pins_stardew_valley"),
    ("DE001", "Decoración", "Póster Stardew Valley (Edición Granja)", "Póster decorativo de alta calidad con diseño inspirado en la granja de Stardew Valley.", 14990, 9, 10, "poster_granja_stardew"),
    ("DE002", "Decoración", "Almohada Pollo De Stardew Valley", "Almohada decorativa con forma del icónico pollo de Stardew Valley.", 15990, 29, 30, "almohada_pollo_stardew"),
    ("GU001", "Guías", "Guía Ilustrada De Cultivos", "Guía impresa a todo color con ilustraciones y consejos para cultivos en Stardew Valley.", 24990, 63, 20, "guia_cultivos_stardew"),
    ("JM001", "Juego De Mesa", "Stardew Valley Juego De Mesa", "Versión física del juego de mesa basado en el mundo de Stardew Valley.", 29990, 55, 30, "juego_mesa_stardew"),
    ("MD001", "Mods Digitales", "Pack De Texturas HD", "Paquete digital de mods para mejorar las texturas del juego a alta definición.", 9990, 241, 100, "pack_texturas_hd"),
    ("PE001", "Peluches", "Peluche De Krobus", "Suave y adorable peluche de Krobus, ideal para fans y coleccionistas.", 19990, 3, 20, "peluche_krobus"),
    ("PP001", "Polera Personalizada", "Polera Stardew Valley Personalizada (Edición Limitada)", "Polera de edición limitada con diseño personalizado inspirado en Stardew Valley.", 11990, 12, 20, "polera_stardew_personalizada"),
];

struct AccountRow {
    run: &'static str,
    name: &'static str,
    surnames: &'static str,
    email: &'static str,
    password: &'static str,
    phone: &'static str,
    birth_date: &'static str,
    class: AccountClass,
    region: &'static str,
    comuna: &'static str,
    address: &'static str,
}

#[rustfmt::skip]
const ACCOUNTS: [AccountRow; 10] = [
    AccountRow { run: "151131969", name: "Luis", surnames: "Contreras Contreras", email: "admin@gmail.com", password: "123456", phone: "985647852", birth_date: "12-08-1985", class: AccountClass::Admin, region: "Región Metropolitana de Santiago", comuna: "Puente Alto", address: "Las Casas 4352" },
    AccountRow { run: "206947953", name: "Marco", surnames: "Suazo Fuentes", email: "marco.suazo@duoc.cl", password: "123321", phone: "965224865", birth_date: "05-04-2000", class: AccountClass::Customer, region: "Región Metropolitana de Santiago", comuna: "San Bernardo", address: "El Pasaje 287" },
    AccountRow { run: "220272430", name: "Felipe", surnames: "Riquelme Acevedo", email: "felipe.riquelme@profesor.duoc.cl", password: "123123", phone: "912345678", birth_date: "04-05-2002", class: AccountClass::Customer, region: "Antofagasta", comuna: "Mejillones", address: "El Barrio 2362" },
    AccountRow { run: "199022800", name: "Roberto", surnames: "Zapata Espinoza", email: "roberto.zapata@duoc.cl", password: "123333", phone: "935688744", birth_date: "20-11-1998", class: AccountClass::Customer, region: "Magallanes y de la Antártica Chilena", comuna: "Punta Arenas", address: "El Vecindario 258" },
    AccountRow { run: "215478967", name: "Ana", surnames: "González Martínez", email: "ana.gonzalez@gmail.com", password: "ana123", phone: "987654321", birth_date: "15-03-2001", class: AccountClass::Customer, region: "Valparaíso", comuna: "Viña del Mar", address: "Av. San Martín 1234" },
    AccountRow { run: "198745633", name: "Carlos", surnames: "López Silva", email: "carlos.lopez@profesor.duoc.cl", password: "carlos456", phone: "956321478", birth_date: "22-07-1995", class: AccountClass::Customer, region: "Región Metropolitana de Santiago", comuna: "Las Condes", address: "Apquindo 4567" },
    AccountRow { run: "225896341", name: "María", surnames: "Silva Rojas", email: "maria.silva@duoc.cl", password: "maria789", phone: "932145687", birth_date: "30-09-2003", class: AccountClass::Customer, region: "Biobío", comuna: "Concepción", address: "O'Higgins 789" },
    AccountRow { run: "187459632", name: "Javier", surnames: "Muñoz Díaz", email: "javier.munoz@gmail.com", password: "javier321", phone: "914785236", birth_date: "10-12-1992", class: AccountClass::Customer, region: "Araucanía", comuna: "Temuco", address: "Manuel Montt 852" },
    AccountRow { run: "210258740", name: "Fernanda", surnames: "Riquelme Vargas", email: "fernanda.riquelme@duoc.cl", password: "fer123", phone: "965874123", birth_date: "18-06-2004", class: AccountClass::Customer, region: "Región Metropolitana de Santiago", comuna: "La Florida", address: "Walker Martínez 963" },
    AccountRow { run: "195874126", name: "Diego", surnames: "Herrera Castillo", email: "diego.herrera@profesor.duoc.cl", password: "diego456", phone: "978546321", birth_date: "25-01-1990", class: AccountClass::Customer, region: "Coquimbo", comuna: "La Serena", address: "Balmaceda 741" },
];

// number, date, customer, status, total
const ORDERS: [(&str, &str, &str, ShipmentStatus, i64); 15] = [
    ("SO1001", "03/10/2025", "206947953", ShipmentStatus::Delivered, 44980),
    ("SO1002", "22/10/2025", "206947953", ShipmentStatus::Pending, 31980),
    ("SO1003", "21/10/2025", "220272430", ShipmentStatus::Shipped, 54970),
    ("SO1004", "12/10/2025", "220272430", ShipmentStatus::Delivered, 24990),
    ("SO1005", "08/10/2025", "199022800", ShipmentStatus::Cancelled, 52470),
    ("SO1006", "18/10/2025", "199022800", ShipmentStatus::Pending, 17980),
    ("SO1007", "15/10/2025", "215478967", ShipmentStatus::Delivered, 74970),
    ("SO1008", "25/10/2025", "215478967", ShipmentStatus::Shipped, 34980),
    ("SO1009", "10/10/2025", "198745633", ShipmentStatus::Delivered, 29990),
    ("SO1010", "28/10/2025", "198745633", ShipmentStatus::Pending, 67470),
    ("SO1011", "14/10/2025", "225896341", ShipmentStatus::Shipped, 44970),
    ("SO1012", "05/10/2025", "187459632", ShipmentStatus::Delivered, 51980),
    ("SO1013", "20/10/2025", "187459632", ShipmentStatus::Pending, 24990),
    ("SO1014", "17/10/2025", "210258740", ShipmentStatus::Shipped, 37480),
    ("SO1015", "30/10/2025", "195874126", ShipmentStatus::Pending, 59970),
];

// order, code, name, quantity, unit price
const LINES: [(&str, &str, &str, u32, i64); 36] = [
    ("SO1001", "PE001", "Peluche De Krobus", 1, 19990),
    ("SO1001", "AC002", "Taza Stardew Valley", 2, 7990),
    ("SO1001", "AC003", "Pins Stardew Valley", 3, 2500),
    ("SO1002", "PP001", "Polera Stardew Valley Personalizada", 1, 11990),
    ("SO1002", "GU001", "Guía Ilustrada De Cultivos", 1, 24990),
    ("SO1003", "JM001", "Stardew Valley Juego De Mesa", 1, 29990),
    ("SO1003", "DE001", "Póster Stardew Valley", 1, 14990),
    ("SO1003", "MD001", "Pack De Texturas HD", 1, 9990),
    ("SO1004", "GU001", "Guía Ilustrada De Cultivos", 1, 24990),
    ("SO1005", "DE002", "Almohada Pollo De Stardew Valley", 2, 15990),
    ("SO1005", "AC001", "Llavero Stardew Valley", 1, 5990),
    ("SO1005", "AC003", "Pins Stardew Valley", 5, 2500),
    ("SO1006", "AC001", "Llavero Stardew Valley", 2, 5990),
    ("SO1006", "AC002", "Taza Stardew Valley", 1, 7990),
    ("SO1007", "PE001", "Peluche De Krobus", 1, 19990),
    ("SO1007", "JM001", "Stardew Valley Juego De Mesa", 1, 29990),
    ("SO1007", "DE001", "Póster Stardew Valley", 1, 14990),
    ("SO1007", "AC003", "Pins Stardew Valley", 4, 2500),
    ("SO1008", "PP001", "Polera Stardew Valley Personalizada", 2, 11990),
    ("SO1008", "AC001", "Llavero Stardew Valley", 2, 5990),
    ("SO1009", "JM001", "Stardew Valley Juego De Mesa", 1, 29990),
    ("SO1010", "PE001", "Peluche De Krobus", 2, 19990),
    ("SO1010", "DE002", "Almohada Pollo De Stardew Valley", 1, 15990),
    ("SO1010", "GU001", "Guía Ilustrada De Cultivos", 1, 24990),
    ("SO1011", "DE001", "Póster Stardew Valley", 1, 14990),
    ("SO1011", "DE002", "Almohada Pollo De Stardew Valley", 1, 15990),
    ("SO1011", "PP001", "Polera Stardew Valley Personalizada", 1, 11990),
    ("SO1012", "GU001", "Guía Ilustrada De Cultivos", 1, 24990),
    ("SO1012", "JM001", "Stardew Valley Juego De Mesa", 1, 29990),
    ("SO1013", "DE002", "Almohada Pollo De Stardew Valley", 1, 15990),
    ("SO1013", "AC002", "Taza Stardew Valley", 1, 7990),
    ("SO1014", "PP001", "Polera Stardew Valley Personalizada", 2, 11990),
    ("SO1014", "AC003", "Pins Stardew Valley", 5, 2500),
    ("SO1015", "PE001", "Peluche De Krobus", 1, 19990),
    ("SO1015", "JM001", "Stardew Valley Juego De Mesa", 1, 29990),
    ("SO1015", "MD001", "Pack De Texturas HD", 1, 9990),
];

/// Fills empty tables with the demo catalog, accounts and order history.
///
/// Passwords are hashed with `credentials`. Committed stock is taken as is;
/// historic orders do not deduct it again.
#[tracing::instrument(skip_all)]
pub async fn seed_if_empty<S: Store>(store: &S, credentials: &Credentials) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    if store.count_products().await? == 0 {
        for (code, category, name, description, price, stock, critical_stock, image) in PRODUCTS {
            store
                .insert_product(Product {
                    code: ProductCode::new(code),
                    category: category.to_string(),
                    name: name.to_string(),
                    description: description.to_string(),
                    price: Money::new(price),
                    stock,
                    critical_stock,
                    image: image.to_string(),
                })
                .await?;
            report.products += 1;
        }
    }

    if store.count_accounts().await? == 0 {
        for row in &ACCOUNTS {
            store
                .insert_account(Account {
                    run: Run::new(row.run),
                    name: row.name.to_string(),
                    surnames: row.surnames.to_string(),
                    email: row.email.to_string(),
                    password_hash: credentials.hash(row.password)?,
                    phone: row.phone.to_string(),
                    birth_date: row.birth_date.to_string(),
                    class: row.class,
                    region: row.region.to_string(),
                    comuna: row.comuna.to_string(),
                    address: row.address.to_string(),
                })
                .await?;
            report.accounts += 1;
        }
    }

    if store.count_orders().await? == 0 {
        for (number, date, customer, status, total) in ORDERS {
            let number = OrderNumber::new(number);
            store
                .insert_order(Order {
                    number: number.clone(),
                    date: date.to_string(),
                    customer: Run::new(customer),
                    status,
                    total: Money::new(total),
                })
                .await?;

            let lines: Vec<NewOrderLine> = LINES
                .iter()
                .filter(|line| line.0 == number.as_str())
                .map(|&(_, code, name, quantity, unit_price)| NewOrderLine {
                    product_code: ProductCode::new(code),
                    product_name: name.to_string(),
                    quantity,
                    unit_price: Money::new(unit_price),
                })
                .collect();
            report.lines += store.insert_lines(&number, lines).await?.len();
            report.orders += 1;
        }
    }

    if !report.is_empty() {
        tracing::info!(
            products = report.products,
            accounts = report.accounts,
            orders = report.orders,
            lines = report.lines,
            "seeded demo data"
        );
    }
    Ok(report)
}
