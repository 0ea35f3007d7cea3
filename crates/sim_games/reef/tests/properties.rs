use proptest::prelude::*;
use sim_reef::catalog::{ArmorBreakSpec, SupportAura};
use sim_reef::combat::{
    stack_aura, SUPPORT_CRIT_CAP, SUPPORT_DAMAGE_CAP, SUPPORT_FIRE_INTERVAL_FLOOR,
    SUPPORT_PIERCE_CAP, SUPPORT_RANGE_CAP,
};
use sim_reef::plan::{CountExpr, CountTerm};
use sim_reef::status::StatusEffects;
use sim_reef::waves::early_start_bonus;
use sim_reef::world::SupportBuff;

fn aura() -> impl Strategy<Value = SupportAura> {
    (1.0f32..1.6, 0.5f32..1.0, 0.0f32..30.0, 0.0f32..0.2, 0.0f32..0.1).prop_map(
        |(damage_mult, fire_interval_mult, range_bonus, crit_bonus, armor_pierce_bonus)| {
            SupportAura {
                radius: 100.0,
                damage_mult,
                fire_interval_mult,
                range_bonus,
                crit_bonus,
                armor_pierce_bonus,
            }
        },
    )
}

fn term() -> impl Strategy<Value = CountTerm> {
    prop_oneof![
        (-3.0f64..3.0).prop_map(|factor| CountTerm::Scaled { factor }),
        (0.0f64..6.0).prop_map(|divisor| CountTerm::Stepped { divisor }),
        (0.0f64..10.0, 0.0f64..6.0)
            .prop_map(|(offset, divisor)| CountTerm::SteppedAfter { offset, divisor }),
    ]
}

proptest! {
    #[test]
    fn armor_ratio_stays_in_unit_interval(
        base in -1.0f32..2.0,
        breaks in prop::collection::vec((0.0f32..1.5, 0.1f32..5.0), 0..6),
    ) {
        let mut status = StatusEffects::default();
        for (amount, duration) in &breaks {
            status.apply_armor_break(ArmorBreakSpec { amount: *amount, duration: *duration });
        }
        let ratio = status.effective_armor_ratio(base);
        prop_assert!((0.0..=1.0).contains(&ratio));

        // strongest break only, never the sum
        let strongest = breaks.iter().map(|(a, _)| *a).fold(0.0f32, f32::max);
        prop_assert_eq!(ratio, (base + strongest).clamp(0.0, 1.0));
    }

    #[test]
    fn stacked_auras_never_exceed_caps(auras in prop::collection::vec(aura(), 0..12)) {
        let mut buff = SupportBuff::NEUTRAL;
        for aura in &auras {
            stack_aura(&mut buff, aura);
        }
        prop_assert!(buff.damage_mult <= SUPPORT_DAMAGE_CAP);
        prop_assert!(buff.fire_interval_mult >= SUPPORT_FIRE_INTERVAL_FLOOR);
        prop_assert!(buff.range_bonus <= SUPPORT_RANGE_CAP);
        prop_assert!(buff.crit_bonus <= SUPPORT_CRIT_CAP);
        prop_assert!(buff.armor_pierce_bonus <= SUPPORT_PIERCE_CAP);
    }

    #[test]
    fn early_bonus_grows_with_streak_and_vanishes_without_countdown(
        remaining in 0.0f32..5.0,
        wave in 0u32..40,
        streak in 0u32..30,
        cond in 1.0f32..1.35,
    ) {
        let base = early_start_bonus(remaining, wave, 0, 1.75, cond, 0.02);
        let streaked = early_start_bonus(remaining, wave, streak, 1.75, cond, 0.02);
        prop_assert!(streaked >= base);
        if remaining <= 0.02 {
            prop_assert_eq!(base, 0);
        } else {
            prop_assert!(base >= 1);
        }
    }

    #[test]
    fn count_formula_is_floored_and_never_negative(
        base in -5.0f64..20.0,
        terms in prop::collection::vec(term(), 0..4),
        wave in 0u32..60,
    ) {
        let expr = terms.iter().fold(CountExpr::constant(base), |e, t| e.with(*t));
        let count = expr.evaluate(wave);
        let raw = terms.iter().fold(base, |acc, t| acc + t.evaluate(wave));
        prop_assert_eq!(count, raw.max(0.0).floor() as u32);
    }
}

#[test]
fn documented_linear_formula() {
    let expr = CountExpr::constant(2.0).with(CountTerm::Scaled { factor: 1.0 });
    assert_eq!(expr.evaluate(5), 7);
    assert_eq!(expr.evaluate(0), 2);
}
