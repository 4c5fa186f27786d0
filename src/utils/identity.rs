use regex::Regex;
use std::sync::OnceLock;

/// 空白输入时使用的固定访客种子
const GUEST_SEED: &str = "guest";

/// 内部键长度 (与站内文档库原生 id 形状一致)
const KEY_LEN: usize = 15;

fn native_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]{15}$").expect("valid regex"))
}

/// 将任意外部标识解析为稳定的内部键
///
/// - 原生形状 (15位小写字母数字) 的 id 原样返回
/// - 其它标识 (如 Discord snowflake) 取 md5 十六进制前15位
/// - 空白输入回退到固定的 "guest" 种子
///
/// 纯函数, 同一输入永远得到同一内部键
pub fn resolve_user_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let seed = if trimmed.is_empty() { GUEST_SEED } else { trimmed };

    if native_id_pattern().is_match(seed) {
        return seed.to_string();
    }

    let digest = format!("{:x}", md5::compute(seed));
    digest[..KEY_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_id_passes_through() {
        let native = "a1b2c3d4e5f6g7h";
        // 'g'和'h'是合法小写字母
        assert_eq!(resolve_user_key(native), native);
    }

    #[test]
    fn test_foreign_id_is_hashed_to_key_shape() {
        // Discord snowflake 形状的外部 id
        let key = resolve_user_key("123456789012345678");
        assert_eq!(key.len(), KEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        // 哈希后的键本身也是原生形状, 再次解析保持稳定
        assert_eq!(resolve_user_key(&key), key);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let a = resolve_user_key("discord:98765");
        let b = resolve_user_key("discord:98765");
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_inputs_get_distinct_keys() {
        assert_ne!(resolve_user_key("user-a"), resolve_user_key("user-b"));
    }

    #[test]
    fn test_blank_input_falls_back_to_guest_seed() {
        let guest = resolve_user_key("");
        assert_eq!(guest, resolve_user_key("   "));
        assert_eq!(guest, resolve_user_key(GUEST_SEED));
        assert_eq!(guest.len(), KEY_LEN);
    }

    #[test]
    fn test_uppercase_id_is_not_native_shape() {
        // 大写字母不符合原生形状, 走哈希
        let key = resolve_user_key("A1B2C3D4E5F6G7H");
        assert_ne!(key, "A1B2C3D4E5F6G7H");
        assert_eq!(key.len(), KEY_LEN);
    }
}
