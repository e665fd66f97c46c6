//! Presentation helpers: explorer links and short addresses

/// `https://explorer.<host>/txn/<hash>?network=<network>`
pub fn transaction_url(host: &str, network: &str, hash: &str) -> String {
    format!("https://explorer.{}/txn/{}?network={}", host, hash, network)
}

/// `0x1234...abcd`; short inputs are returned unchanged
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_url() {
        assert_eq!(
            transaction_url("aptoslabs.com", "testnet", "0xdeadbeef"),
            "https://explorer.aptoslabs.com/txn/0xdeadbeef?network=testnet"
        );
    }

    #[test]
    fn test_short_address() {
        assert_eq!(short_address("0x1234567890abcdef"), "0x1234...cdef");
        assert_eq!(short_address("0x1"), "0x1");
    }
}
