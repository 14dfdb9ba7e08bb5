// Static fallback dataset for the legacy load path.
//
// When the Sheets API strategy cannot reach the spreadsheet it substitutes
// this small, plausible sample so the dashboard still renders.
use crate::types::Obra;

pub fn mock_obras() -> Vec<Obra> {
    fn obra(
        protocol: &str,
        description: &str,
        locality: &str,
        area: f64,
        category: &str,
        status: &str,
        target_year: i32,
        planned_value: f64,
        contracted_value: f64,
        progress_percent: f64,
        force: &str,
    ) -> Obra {
        Obra {
            protocol: protocol.to_string(),
            description: description.to_string(),
            locality: locality.to_string(),
            area,
            category: category.to_string(),
            status: status.to_string(),
            target_year,
            planned_value,
            contracted_value,
            progress_percent,
            force: force.to_string(),
            budget_flag: String::new(),
        }
    }

    vec![
        obra(
            "P001",
            "Construção de Quartel do Corpo de Bombeiros",
            "Curitiba",
            1200.0,
            "Construção",
            "Em andamento",
            2024,
            2_500_000.0,
            2_300_000.0,
            65.0,
            "Bombeiros",
        ),
        obra(
            "P002",
            "Reforma de Delegacia da Polícia Civil",
            "Londrina",
            800.0,
            "Reforma",
            "Em planejamento",
            2026,
            800_000.0,
            750_000.0,
            15.0,
            "Polícia Civil",
        ),
        obra(
            "P003",
            "Ampliação de Batalhão da Polícia Militar",
            "Maringá",
            1500.0,
            "Ampliação",
            "Concluída",
            2023,
            1_800_000.0,
            1_650_000.0,
            100.0,
            "Polícia Militar",
        ),
        obra(
            "P004",
            "Construção de Instituto de Criminalística",
            "Cascavel",
            2000.0,
            "Construção",
            "Em andamento",
            2024,
            3_200_000.0,
            3_000_000.0,
            40.0,
            "Polícia Científica",
        ),
        obra(
            "P005",
            "Reforma de Casa de Custódia",
            "Foz do Iguaçu",
            3000.0,
            "Reforma",
            "Em andamento",
            2024,
            4_500_000.0,
            4_200_000.0,
            30.0,
            "DEPEN",
        ),
        obra(
            "P006",
            "Construção de Nova Delegacia Regional",
            "Ponta Grossa",
            1800.0,
            "Construção",
            "Em planejamento",
            2026,
            2_800_000.0,
            0.0,
            0.0,
            "Polícia Civil",
        ),
    ]
}
