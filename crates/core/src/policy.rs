//! Fixed rules for free-practice simulations.

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::profile::ExperienceLevel;
use crate::simulation::{ClientPersona, Difficulty, PainLevel, Personality};

/// Quick-simulation difficulty for a learner: senior plays hard, mid plays
/// medium, everyone else (including learners without a profile) plays easy.
pub fn quick_simulation_difficulty(level: Option<ExperienceLevel>) -> Difficulty {
    match level {
        Some(ExperienceLevel::Senior) => Difficulty::Hard,
        Some(ExperienceLevel::Mid) => Difficulty::Medium,
        Some(ExperienceLevel::Junior) | None => Difficulty::Easy,
    }
}

fn persona(
    name: &str,
    role: &str,
    company: &str,
    personality: Personality,
    pain_level: PainLevel,
    objections: [&str; 2],
    decision_maker: bool,
) -> ClientPersona {
    ClientPersona {
        name: name.to_string(),
        role: role.to_string(),
        company: company.to_string(),
        personality,
        pain_level,
        objections: objections.iter().map(|o| o.to_string()).collect(),
        decision_maker,
    }
}

/// The personas a quick simulation draws from.
pub fn quick_persona_pool() -> Vec<ClientPersona> {
    vec![
        persona(
            "Carlos Méndez",
            "Director de Operaciones",
            "TechFlow Solutions",
            Personality::Analytical,
            PainLevel::Medium,
            [
                "El precio es alto para nuestro presupuesto actual",
                "Necesito ver ROI claro antes de decidir",
            ],
            true,
        ),
        persona(
            "María López",
            "Gerente de Compras",
            "Grupo Retail Plus",
            Personality::Driver,
            PainLevel::High,
            [
                "Ya tenemos un proveedor que nos funciona bien",
                "No tengo tiempo para implementaciones largas",
            ],
            false,
        ),
        persona(
            "Andrés García",
            "CEO",
            "InnovaDigital",
            Personality::Expressive,
            PainLevel::Low,
            [
                "Suena interesante pero no es prioridad ahora",
                "Necesito consultarlo con mi equipo",
            ],
            true,
        ),
    ]
}

pub fn pick_quick_persona<R: Rng + ?Sized>(rng: &mut R) -> ClientPersona {
    let pool = quick_persona_pool();
    // The pool is a non-empty constant, so `choose` always yields.
    pool.choose(rng).cloned().unwrap_or_else(|| pool[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_difficulty_policy() {
        assert_eq!(
            quick_simulation_difficulty(Some(ExperienceLevel::Senior)),
            Difficulty::Hard
        );
        assert_eq!(
            quick_simulation_difficulty(Some(ExperienceLevel::Mid)),
            Difficulty::Medium
        );
        assert_eq!(
            quick_simulation_difficulty(Some(ExperienceLevel::Junior)),
            Difficulty::Easy
        );
        assert_eq!(quick_simulation_difficulty(None), Difficulty::Easy);
    }

    #[test]
    fn test_pool_personas_declare_objections() {
        let pool = quick_persona_pool();
        assert_eq!(pool.len(), 3);
        assert!(pool.iter().all(|p| !p.objections.is_empty()));
    }

    #[test]
    fn test_pick_is_from_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = quick_persona_pool();
        for _ in 0..10 {
            let picked = pick_quick_persona(&mut rng);
            assert!(pool.contains(&picked));
        }
    }
}
