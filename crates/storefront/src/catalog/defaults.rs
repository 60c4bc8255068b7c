//! Built-in catalog served when the catalog service is unreachable.

use soko_core::{Category, Price, Product, ProductId, Stock};

struct Row {
    id: &'static str,
    name: &'static str,
    /// Price in minor units.
    price: u32,
    image: &'static str,
    description: &'static str,
    category: &'static str,
    unit: &'static str,
    in_stock: bool,
}

const TUBERS_IMAGE: &str = "https://images.unsplash.com/photo-1518977676601-b53f82aba655";
const GRAINS_IMAGE: &str = "https://images.unsplash.com/photo-1586201375761-83865001e31c";
const OILS_IMAGE: &str = "https://images.unsplash.com/photo-1474979266404-7eaacbcd87c5";

const ROWS: &[Row] = &[
    Row {
        id: "1",
        name: "Sweet Potatoes",
        price: 399,
        image: TUBERS_IMAGE,
        description: "Fresh organic sweet potatoes, perfect for roasting or baking",
        category: "tubers",
        unit: "per lb",
        in_stock: true,
    },
    Row {
        id: "2",
        name: "Russet Potatoes",
        price: 249,
        image: TUBERS_IMAGE,
        description: "High-quality russet potatoes, ideal for fries and mashing",
        category: "tubers",
        unit: "per lb",
        in_stock: true,
    },
    Row {
        id: "3",
        name: "Cassava Root",
        price: 499,
        image: TUBERS_IMAGE,
        description: "Fresh cassava root, a staple carbohydrate source",
        category: "tubers",
        unit: "per lb",
        in_stock: true,
    },
    Row {
        id: "4",
        name: "Organic Brown Rice",
        price: 599,
        image: GRAINS_IMAGE,
        description: "Premium organic brown rice, 5lb bag",
        category: "grains",
        unit: "5lb bag",
        in_stock: true,
    },
    Row {
        id: "5",
        name: "Quinoa",
        price: 899,
        image: GRAINS_IMAGE,
        description: "High-protein quinoa, perfect for healthy meals",
        category: "grains",
        unit: "2lb bag",
        in_stock: true,
    },
    Row {
        id: "6",
        name: "Steel Cut Oats",
        price: 449,
        image: GRAINS_IMAGE,
        description: "Premium steel cut oats for nutritious breakfast",
        category: "grains",
        unit: "2lb bag",
        in_stock: true,
    },
    Row {
        id: "7",
        name: "Organic Spinach",
        price: 349,
        image: "https://images.unsplash.com/photo-1576045057995-568f588f82fb",
        description: "Fresh organic baby spinach leaves",
        category: "vegetables",
        unit: "per bunch",
        in_stock: true,
    },
    Row {
        id: "8",
        name: "Bell Peppers",
        price: 299,
        image: "https://images.unsplash.com/photo-1563565375-f3fdfdbefa83",
        description: "Colorful bell peppers, mix of red, yellow, and green",
        category: "vegetables",
        unit: "per lb",
        in_stock: true,
    },
    Row {
        id: "9",
        name: "Broccoli Crowns",
        price: 279,
        image: "https://images.unsplash.com/photo-1459411621453-7b03977f4bfc",
        description: "Fresh broccoli crowns, rich in vitamins and minerals",
        category: "vegetables",
        unit: "per lb",
        in_stock: true,
    },
    Row {
        id: "10",
        name: "Extra Virgin Olive Oil",
        price: 1299,
        image: OILS_IMAGE,
        description: "Premium cold-pressed extra virgin olive oil",
        category: "oils",
        unit: "500ml bottle",
        in_stock: true,
    },
    Row {
        id: "11",
        name: "Coconut Oil",
        price: 999,
        image: OILS_IMAGE,
        description: "Organic virgin coconut oil, perfect for cooking and baking",
        category: "oils",
        unit: "16oz jar",
        in_stock: true,
    },
    Row {
        id: "12",
        name: "Avocado Oil",
        price: 1499,
        image: OILS_IMAGE,
        description: "Cold-pressed avocado oil with high smoke point",
        category: "oils",
        unit: "500ml bottle",
        in_stock: true,
    },
    Row {
        id: "13",
        name: "Organic Bananas",
        price: 199,
        image: "https://images.unsplash.com/photo-1603833665858-e61d17a86224",
        description: "Fresh organic bananas, perfect for snacking",
        category: "fruits",
        unit: "per lb",
        in_stock: true,
    },
    Row {
        id: "14",
        name: "Gala Apples",
        price: 349,
        image: "https://images.unsplash.com/photo-1560806887-1e4cd0b6cbd6",
        description: "Crisp and sweet Gala apples",
        category: "fruits",
        unit: "per lb",
        in_stock: true,
    },
    Row {
        id: "15",
        name: "Black Beans",
        price: 299,
        image: GRAINS_IMAGE,
        description: "Dried black beans, high in protein and fiber",
        category: "legumes",
        unit: "2lb bag",
        in_stock: true,
    },
    Row {
        id: "16",
        name: "Chickpeas",
        price: 349,
        image: GRAINS_IMAGE,
        description: "Premium dried chickpeas, perfect for hummus",
        category: "legumes",
        unit: "2lb bag",
        in_stock: true,
    },
];

/// The default catalog, in display order.
///
/// Rows carry only an in-stock flag, which maps to a stock of one.
#[must_use]
pub fn default_catalog() -> Vec<Product> {
    ROWS.iter()
        .filter_map(|row| {
            Some(Product {
                id: ProductId::parse(row.id).ok()?,
                name: row.name.to_string(),
                price: Price::from_minor_units(row.price),
                unit: row.unit.to_string(),
                category: Category::parse(row.category).ok()?,
                description: Some(row.description.to_string()),
                image: Some(row.image.to_string()),
                available_stock: Stock::new(u32::from(row.in_stock)),
            })
        })
        .collect()
}
