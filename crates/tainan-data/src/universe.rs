//! Securities excluded from the research universe.

use std::collections::BTreeSet;
use tainan_traits::Security;

/// Preferred shares listed alongside their common stock. Their prices track
/// the coupon rather than the business, so they are dropped before sorting.
pub const PREFERRED_SHARES: [&str; 29] = [
    "3702A 大聯大甲特",
    "2891B 中信金乙特",
    "2891C 中信金丙特",
    "5871A 中租-KY甲特",
    "2002A 中鋼特",
    "3036A 文曄甲特",
    "2897A 王道銀甲特",
    "1101B 台泥乙特",
    "2887Z1 台新己特",
    "2887E 台新戊特",
    "2887F 台新戊特二",
    "8112A 至上甲特",
    "6592B 和潤企業乙特",
    "6592A 和潤企業甲特",
    "8349A 恒耀甲特",
    "2348A 海悅甲特",
    "2836A 高雄銀甲特",
    "2882B 國泰金乙特",
    "2882A 國泰特",
    "1312A 國喬特",
    "1522A 堤維西甲特",
    "2881B 富邦金乙特",
    "2881C 富邦金丙特",
    "2881A 富邦特",
    "2883B 開發金乙特",
    "2888B 新光金乙特",
    "2888A 新光金甲特",
    "9941A 裕融甲特",
    "2838A 聯邦銀甲特",
];

/// Set of securities to drop. Defaults to [`PREFERRED_SHARES`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialSecurities(BTreeSet<Security>);

impl Default for SpecialSecurities {
    fn default() -> Self {
        Self(PREFERRED_SHARES.iter().map(|s| Security::from(*s)).collect())
    }
}

impl SpecialSecurities {
    /// An empty exclusion set.
    pub const fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Add a security to the set.
    pub fn insert(&mut self, security: Security) -> bool {
        self.0.insert(security)
    }

    /// Whether `security` is excluded.
    pub fn contains(&self, security: &Security) -> bool {
        self.0.contains(security)
    }

    /// Number of excluded securities.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is excluded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Extend<Security> for SpecialSecurities {
    fn extend<T: IntoIterator<Item = Security>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}
