//! 核心宏定义
//!
//! 配置结构体与值类型大量使用固定默认值，这里统一生成 `Default` 实现

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use grasp_engine::impl_default;
///
/// struct HoverTuning {
///     hover_distance: f32,
///     enabled: bool,
/// }
///
/// impl_default!(HoverTuning {
///     hover_distance: 0.1,
///     enabled: true,
/// });
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {

    struct CooldownTimer {
        remaining: f32,
        duration: f32,
    }

    impl_default!(CooldownTimer {
        remaining: 0.0,
        duration: 0.125,
    });

    #[test]
    fn test_impl_default() {
        let timer = CooldownTimer::default();
        assert_eq!(timer.remaining, 0.0);
        assert_eq!(timer.duration, 0.125);
    }
}
