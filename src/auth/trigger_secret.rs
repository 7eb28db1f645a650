/// 触发器共享密钥校验
///
/// 未配置密钥时放行所有请求（宿主平台已在网络层做了隔离）。
#[derive(Debug, Clone, Default)]
pub struct TriggerSecret {
    secret: Option<String>,
}

impl TriggerSecret {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// 校验请求携带的密钥
    pub fn verify(&self, provided: Option<&str>) -> bool {
        match (&self.secret, provided) {
            (None, _) => true,
            (Some(expected), Some(provided)) => {
                // 使用恒定时间比较防止时序攻击
                constant_time_compare(provided.as_bytes(), expected.as_bytes())
            }
            (Some(_), None) => false,
        }
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_allows_everything() {
        let secret = TriggerSecret::new(None);
        assert!(!secret.is_enabled());
        assert!(secret.verify(None));
        assert!(secret.verify(Some("anything")));

        // 空字符串等同于未配置
        assert!(!TriggerSecret::new(Some(String::new())).is_enabled());
    }

    #[test]
    fn test_enabled_requires_exact_match() {
        let secret = TriggerSecret::new(Some("s3cret".to_string()));
        assert!(secret.verify(Some("s3cret")));
        assert!(!secret.verify(Some("s3cre")));
        assert!(!secret.verify(Some("s3cret!")));
        assert!(!secret.verify(None));
    }
}
