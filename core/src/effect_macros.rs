//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use checkout_core::async_effect;
///
/// async_effect! {
///     let catalog = source.fetch().await.ok()?;
///     Some(CheckoutAction::PricesLoaded { catalog })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use checkout_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(1),
///     action: CheckoutAction::TimerTicked
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Wrap an effect so a later effect with the same id supersedes it
///
/// # Example
///
/// ```rust,ignore
/// use checkout_core::cancellable;
///
/// cancellable! {
///     id: DISCOUNT_EFFECT,
///     effect: async_effect! { Some(CheckoutAction::DiscountResolved { .. }) }
/// }
/// ```
#[macro_export]
macro_rules! cancellable {
    (
        id: $id:expr,
        effect: $effect:expr
    ) => {
        $crate::effect::Effect::Cancellable {
            id: $id,
            effect: ::std::boxed::Box::new($effect),
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::{Effect, EffectId};
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Resolved { value: i32 },
        Ticked,
    }

    #[test]
    fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::Resolved { value: 42 })
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[tokio::test]
    async fn test_async_effect_yields_action() {
        let effect = async_effect! {
            Some(TestAction::Resolved { value: 7 })
        };

        let Effect::Future(fut) = effect else {
            unreachable!("async_effect! always builds a Future");
        };
        assert_eq!(fut.await, Some(TestAction::Resolved { value: 7 }));
    }

    #[test]
    fn test_delay_macro() {
        let effect = delay! {
            duration: Duration::from_secs(1),
            action: TestAction::Ticked
        };

        assert!(matches!(effect, Effect::Delay { .. }));
    }

    #[test]
    fn test_cancellable_macro() {
        let id = EffectId::new("timer");
        let effect = cancellable! {
            id: id,
            effect: delay! {
                duration: Duration::from_secs(1),
                action: TestAction::Ticked
            }
        };

        match effect {
            Effect::Cancellable { id: got, effect } => {
                assert_eq!(got, id);
                assert!(matches!(*effect, Effect::Delay { .. }));
            },
            other => unreachable!("unexpected effect {other:?}"),
        }
    }
}
