//! Page interest markers
//!
//! Tags pages that expose authentication or account-recovery flows or
//! interactive forms, from keywords in the raw content.

/// A marker and the keywords that trigger it
struct MarkerRule {
    name: &'static str,
    keywords: &'static [&'static str],
}

const RULES: &[MarkerRule] = &[
    MarkerRule {
        name: "login",
        keywords: &[
            "login", "log in", "sign in", "signin", "remember me", "session expired",
            "登录", "账号登录", "密码登录", "扫码登录", "记住我", "自动登录", "请先登录",
            "登录失效", "重新登录",
        ],
    },
    MarkerRule {
        name: "registration",
        keywords: &[
            "register", "sign up", "signup", "create account", "create an account",
            "注册", "新用户注册", "创建账号", "注册账号", "手机号注册", "邮箱注册",
        ],
    },
    MarkerRule {
        name: "verification-code",
        keywords: &[
            "verification code", "verify code", "captcha", "one-time code",
            "验证码", "短信验证码", "获取验证码", "发送验证码", "输入验证码", "身份验证",
            "二次验证",
        ],
    },
    MarkerRule {
        name: "password-reset",
        keywords: &[
            "forgot password", "reset password", "password reset", "change password",
            "new password", "confirm password",
            "忘记密码", "找回密码", "重置密码", "修改密码", "新密码", "确认密码",
        ],
    },
    MarkerRule {
        name: "form-elements",
        keywords: &["<form", "<input", "<textarea", "<select"],
    },
];

/// Returns the names of every marker whose keywords occur in the content
pub fn detect_markers(content: &str) -> Vec<String> {
    let lower = content.to_lowercase();
    RULES
        .iter()
        .filter(|rule| rule.keywords.iter().any(|k| lower.contains(k)))
        .map(|rule| rule.name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_login_form() {
        let html = r#"<html><body><h1>Sign In</h1><form action="/auth"><input name="user">
            <a href="/forgot">Forgot password?</a></form></body></html>"#;
        let markers = detect_markers(html);
        assert!(markers.contains(&"login".to_string()));
        assert!(markers.contains(&"password-reset".to_string()));
        assert!(markers.contains(&"form-elements".to_string()));
        assert!(!markers.contains(&"registration".to_string()));
    }

    #[test]
    fn test_detect_chinese_keywords() {
        let markers = detect_markers("<div>新用户注册</div><span>获取验证码</span>");
        assert_eq!(markers, vec!["registration".to_string(), "verification-code".to_string()]);
    }

    #[test]
    fn test_plain_page_has_no_markers() {
        let html = "<html><body><h1>Welcome</h1><p>Quarterly report.</p></body></html>";
        assert!(detect_markers(html).is_empty());
    }
}
