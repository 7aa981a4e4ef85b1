//! SABRモデル実装
//!
//! SABR (Stochastic Alpha, Beta, Rho) モデルは以下のSDEで記述される
//! 確率的ボラティリティモデル:
//! ```text
//! dF = alpha * F^beta * dW_F
//! d(alpha) = nu * alpha * dW_alpha
//! E[dW_F * dW_alpha] = rho * dt
//! ```
//! ここで:
//! - F = フォワードレート
//! - alpha = 瞬間ボラティリティ
//! - beta = CEVパラメータ (0: Normal, 1: Lognormal)
//! - nu = ボラティリティのボラティリティ (vol-of-vol)
//! - rho = フォワードとボラティリティの相関
//!
//! ## Hagan公式
//!
//! 本実装ではHagan et al. (2002) のBlackインプライドボラティリティ近似公式を使用。
//! z → 0 (ATM近傍または nu → 0) では z/x(z) をTaylor展開で評価し、
//! 特異点を回避する。
//!
//! ## 感応度 (adjoint)
//!
//! 公式は `DualNum<f64>` に対してジェネリックに実装されている。
//! `f64` で評価すれば値、`Dual64` で評価すれば1方向の微分が得られる。
//! [`SABRModel::implied_vol_adjoint`] はフォワード、ストライク、
//! alpha, beta, rho, nu に関する偏微分をまとめて返す。
//!
//! ## 使用例
//!
//! ```
//! use capfloor_models::models::sabr::{SABRModel, SABRParams};
//!
//! // パラメータを作成
//! let params = SABRParams::new(
//!     0.03,   // フォワードレート
//!     0.04,   // 初期ボラティリティ (alpha)
//!     0.4,    // vol-of-vol (nu)
//!     -0.3,   // 相関 (rho)
//!     0.5,    // ベータ
//!     2.0,    // 満期
//! )
//! .unwrap();
//! let model = SABRModel::new(params).unwrap();
//!
//! let vol = model.implied_vol(0.035).unwrap();
//! let adjoint = model.implied_vol_adjoint(0.035).unwrap();
//! assert!((adjoint.vol - vol).abs() < 1e-15);
//! assert!(adjoint.d_alpha > 0.0);
//! ```

use num_dual::{Dual64, DualNum};
use thiserror::Error;

/// この閾値未満の |z| では z/x(z) を級数展開で評価する
const Z_SERIES_THRESHOLD: f64 = 1e-5;

/// SABRモデルエラー型
///
/// パラメータ検証と数値計算時のエラーを表現する。
///
/// # バリアント
///
/// - `InvalidForward`: フォワードが正でない
/// - `InvalidAlpha`: 初期ボラティリティが正でない
/// - `InvalidNu`: vol-of-volが負
/// - `InvalidBeta`: ベータが[0, 1]の範囲外
/// - `InvalidRho`: 相関が(-1, 1)の範囲外
/// - `InvalidMaturity`: 満期が負
/// - `InvalidStrike`: ストライクが正でない
/// - `NegativeImpliedVol`: 負のインプライドボラティリティが計算された
/// - `NonFinite`: NaNまたは無限大が検出された
///
/// # 例
///
/// ```
/// use capfloor_models::models::sabr::SABRError;
///
/// let err = SABRError::InvalidAlpha(-0.1);
/// assert!(format!("{}", err).contains("-0.1"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SABRError {
    /// 無効なフォワード（正でなければならない）
    #[error("無効なフォワード: F = {0} (正の値が必要)")]
    InvalidForward(f64),

    /// 無効な初期ボラティリティ（正でなければならない）
    #[error("無効な初期ボラティリティ: alpha = {0} (正の値が必要)")]
    InvalidAlpha(f64),

    /// 無効なvol-of-vol（非負でなければならない）
    #[error("無効なvol-of-vol: nu = {0} (非負の値が必要)")]
    InvalidNu(f64),

    /// 無効なベータ（0から1の範囲内でなければならない）
    #[error("無効なベータ: beta = {0} ([0, 1]の範囲が必要)")]
    InvalidBeta(f64),

    /// 無効な相関係数（-1から1の開区間内でなければならない）
    #[error("無効な相関係数: rho = {0} ((-1, 1)の範囲が必要)")]
    InvalidRho(f64),

    /// 無効な満期（非負でなければならない）
    #[error("無効な満期: T = {0} (非負の値が必要)")]
    InvalidMaturity(f64),

    /// 無効なストライク（正でなければならない）
    #[error("無効なストライク: K = {0} (正の値が必要)")]
    InvalidStrike(f64),

    /// 負のインプライドボラティリティが計算された
    #[error("ストライク {0} で負のインプライドボラティリティが計算されました")]
    NegativeImpliedVol(f64),

    /// NaNまたは無限大が検出された
    #[error("{0}でNaNまたはInfinityが検出されました")]
    NonFinite(String),
}

/// SABRモデルパラメータ
///
/// # フィールド
///
/// * `forward` - フォワードレート (F > 0)
/// * `alpha` - 初期ボラティリティ (alpha > 0)
/// * `nu` - ボラティリティのボラティリティ (nu >= 0)
/// * `rho` - 相関係数 (-1 < rho < 1)
/// * `beta` - CEVパラメータ (0 <= beta <= 1)
/// * `maturity` - 満期までの時間 (T >= 0)
///
/// # 例
///
/// ```
/// use capfloor_models::models::sabr::SABRParams;
///
/// let params = SABRParams::new(0.03, 0.04, 0.4, -0.3, 0.5, 1.0);
/// assert!(params.is_ok());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SABRParams {
    /// フォワードレート (F)
    pub forward: f64,
    /// 初期ボラティリティ (alpha)
    pub alpha: f64,
    /// ボラティリティのボラティリティ (nu)
    pub nu: f64,
    /// 相関係数 (rho)
    pub rho: f64,
    /// CEVパラメータ (beta): 0 = Normal, 1 = Lognormal
    pub beta: f64,
    /// 満期までの時間
    pub maturity: f64,
}

impl SABRParams {
    /// 新しいSABRパラメータを作成（検証付き）
    ///
    /// # 引数
    ///
    /// * `forward` - フォワードレート（正でなければならない）
    /// * `alpha` - 初期ボラティリティ（正でなければならない）
    /// * `nu` - vol-of-vol（非負でなければならない）
    /// * `rho` - 相関係数（-1から1の開区間）
    /// * `beta` - CEVパラメータ（0から1の範囲）
    /// * `maturity` - 満期（非負でなければならない）
    ///
    /// # 例
    ///
    /// ```
    /// use capfloor_models::models::sabr::SABRParams;
    ///
    /// // 無効なalpha
    /// let invalid = SABRParams::new(0.03, -0.2, 0.4, -0.3, 0.5, 1.0);
    /// assert!(invalid.is_err());
    /// ```
    pub fn new(
        forward: f64,
        alpha: f64,
        nu: f64,
        rho: f64,
        beta: f64,
        maturity: f64,
    ) -> Result<Self, SABRError> {
        let params = Self {
            forward,
            alpha,
            nu,
            rho,
            beta,
            maturity,
        };
        params.validate()?;
        Ok(params)
    }

    /// パラメータを検証
    pub fn validate(&self) -> Result<(), SABRError> {
        if !(self.forward > 0.0) || !self.forward.is_finite() {
            return Err(SABRError::InvalidForward(self.forward));
        }
        if !(self.alpha > 0.0) || !self.alpha.is_finite() {
            return Err(SABRError::InvalidAlpha(self.alpha));
        }
        if !(self.nu >= 0.0) || !self.nu.is_finite() {
            return Err(SABRError::InvalidNu(self.nu));
        }
        if !(self.rho > -1.0 && self.rho < 1.0) {
            return Err(SABRError::InvalidRho(self.rho));
        }
        if !(0.0..=1.0).contains(&self.beta) {
            return Err(SABRError::InvalidBeta(self.beta));
        }
        if !(self.maturity >= 0.0) || !self.maturity.is_finite() {
            return Err(SABRError::InvalidMaturity(self.maturity));
        }
        Ok(())
    }
}

/// インプライドボラティリティとその偏微分
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SABRVolAdjoint {
    /// Blackインプライドボラティリティ
    pub vol: f64,
    /// ∂σ/∂F
    pub d_forward: f64,
    /// ∂σ/∂K
    pub d_strike: f64,
    /// ∂σ/∂alpha
    pub d_alpha: f64,
    /// ∂σ/∂beta
    pub d_beta: f64,
    /// ∂σ/∂rho
    pub d_rho: f64,
    /// ∂σ/∂nu
    pub d_nu: f64,
}

/// SABRモデル（インプライドボラティリティ計算用）
///
/// # Hagan公式
///
/// インプライドボラティリティは以下の式で近似される:
/// ```text
/// σ_B(K,F) = α / [(FK)^((1-β)/2) * D(F/K)]
///            × (z/x(z))
///            × [1 + expansion_terms * T]
/// ```
/// ここで:
/// - D(F/K) = 1 + ((1-β)²/24)*ln²(F/K) + ((1-β)⁴/1920)*ln⁴(F/K)
/// - z = (ν/α)*(FK)^((1-β)/2)*ln(F/K)
/// - x(z) = ln((√(1-2ρz+z²)+z-ρ)/(1-ρ))
/// - expansion_terms = (1-β)²α²/(24(FK)^(1-β)) + ρβνα/(4(FK)^((1-β)/2)) + (2-3ρ²)ν²/24
#[derive(Clone, Debug)]
pub struct SABRModel {
    /// モデルパラメータ
    params: SABRParams,
}

impl SABRModel {
    /// 新しいSABRモデルを作成
    ///
    /// # エラー
    ///
    /// パラメータが無効な場合はエラーを返す
    pub fn new(params: SABRParams) -> Result<Self, SABRError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// パラメータへの参照を取得
    pub fn params(&self) -> &SABRParams {
        &self.params
    }

    /// ATMインプライドボラティリティを計算
    ///
    /// ```text
    /// σ_ATM = α / F^(1-β) * [1 + expansion_terms * T]
    /// ```
    pub fn atm_vol(&self) -> Result<f64, SABRError> {
        self.implied_vol(self.params.forward)
    }

    /// ストライク `strike` のBlackインプライドボラティリティを計算
    ///
    /// # エラー
    ///
    /// - `InvalidStrike`: ストライクが正でない
    /// - `NonFinite`: 計算結果がNaNまたは無限大
    /// - `NegativeImpliedVol`: 計算結果が正でない
    pub fn implied_vol(&self, strike: f64) -> Result<f64, SABRError> {
        // ストライク検証
        if !(strike > 0.0) || !strike.is_finite() {
            return Err(SABRError::InvalidStrike(strike));
        }
        let p = &self.params;
        let vol = hagan_formula(
            p.forward,
            strike,
            p.maturity,
            p.alpha,
            p.beta,
            p.rho,
            p.nu,
        );
        check_vol(vol, strike)
    }

    /// インプライドボラティリティと6つの入力に関する偏微分を計算
    ///
    /// 各入力方向に1回ずつ `Dual64` で公式を評価する（前進モードAD）。
    pub fn implied_vol_adjoint(&self, strike: f64) -> Result<SABRVolAdjoint, SABRError> {
        let vol = self.implied_vol(strike)?;
        let p = &self.params;
        let inputs = [p.forward, strike, p.alpha, p.beta, p.rho, p.nu];

        let mut grad = [0.0; 6];
        for (i, g) in grad.iter_mut().enumerate() {
            let seeded: [Dual64; 6] = std::array::from_fn(|j| {
                Dual64::new(inputs[j], if i == j { 1.0 } else { 0.0 })
            });
            let [f, k, alpha, beta, rho, nu] = seeded;
            let dual = hagan_formula(f, k, p.maturity, alpha, beta, rho, nu);
            if !dual.eps.is_finite() {
                return Err(SABRError::NonFinite("implied_vol_adjoint".to_string()));
            }
            *g = dual.eps;
        }

        Ok(SABRVolAdjoint {
            vol,
            d_forward: grad[0],
            d_strike: grad[1],
            d_alpha: grad[2],
            d_beta: grad[3],
            d_rho: grad[4],
            d_nu: grad[5],
        })
    }
}

fn check_vol(vol: f64, strike: f64) -> Result<f64, SABRError> {
    // 結果の検証
    if !vol.is_finite() {
        return Err(SABRError::NonFinite("implied_vol".to_string()));
    }
    // 負のボラティリティチェック
    if vol <= 0.0 {
        return Err(SABRError::NegativeImpliedVol(strike));
    }
    Ok(vol)
}

/// Hagan公式本体
///
/// `D = f64` で値、`D = Dual64` で方向微分を返す。入力は検証済みであること。
fn hagan_formula<D: DualNum<f64> + Copy>(
    forward: D,
    strike: D,
    maturity: f64,
    alpha: D,
    beta: D,
    rho: D,
    nu: D,
) -> D {
    let one = D::one();
    let one_minus_beta = one - beta;

    // ln(F/K)
    let log_fk = (forward / strike).ln();

    // (FK)^((1-β)/2): 指数も微分対象なので exp/ln で評価
    let fk = forward * strike;
    let fk_pow_half = (fk.ln() * one_minus_beta * 0.5).exp();
    let fk_pow_full = fk_pow_half * fk_pow_half;

    // D(F/K) = 1 + ((1-β)²/24)*ln²(F/K) + ((1-β)⁴/1920)*ln⁴(F/K)
    let log_fk_2 = log_fk * log_fk;
    let one_minus_beta_2 = one_minus_beta * one_minus_beta;
    let d = one
        + one_minus_beta_2 * log_fk_2 / 24.0
        + one_minus_beta_2 * one_minus_beta_2 * log_fk_2 * log_fk_2 / 1920.0;

    // z = (ν/α) * (FK)^((1-β)/2) * ln(F/K)
    let z = nu / alpha * fk_pow_half * log_fk;

    // z/x(z): z → 0 では 1 - ρz/2 + (2-3ρ²)z²/12
    let z_over_x = if z.re().abs() < Z_SERIES_THRESHOLD {
        one - rho * z * 0.5 + (one * 2.0 - rho * rho * 3.0) * z * z / 12.0
    } else {
        z / x_of_z(z, rho)
    };

    // term1 = (1-β)² / 24 * α² / (FK)^(1-β)
    let term1 = one_minus_beta_2 * alpha * alpha / (fk_pow_full * 24.0);
    // term2 = ρ * β * ν * α / (4 * (FK)^((1-β)/2))
    let term2 = rho * beta * nu * alpha / (fk_pow_half * 4.0);
    // term3 = (2 - 3ρ²) / 24 * ν²
    let term3 = (one * 2.0 - rho * rho * 3.0) * nu * nu / 24.0;

    let expansion = one + (term1 + term2 + term3) * maturity;

    alpha / (fk_pow_half * d) * z_over_x * expansion
}

/// x(z) = ln((√(1-2ρz+z²) + z - ρ) / (1-ρ))
fn x_of_z<D: DualNum<f64> + Copy>(z: D, rho: D) -> D {
    let one = D::one();
    let sqrt_disc = (one - rho * z * 2.0 + z * z).sqrt();
    ((sqrt_disc + z - rho) / (one - rho)).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn model(beta: f64) -> SABRModel {
        SABRModel::new(SABRParams::new(0.03, 0.04, 0.5, -0.25, beta, 3.0).unwrap()).unwrap()
    }

    // ----------------------------------------------------------------
    // SABRError tests
    // ----------------------------------------------------------------

    #[test]
    fn test_sabr_error_invalid_forward_message() {
        let err = SABRError::InvalidForward(-100.0);
        let msg = format!("{}", err);
        assert!(msg.contains("-100"));
        assert!(msg.contains("フォワード"));
    }

    #[test]
    fn test_sabr_error_invalid_strike_message() {
        let err = SABRError::InvalidStrike(-50.0);
        let msg = format!("{}", err);
        assert!(msg.contains("-50"));
        assert!(msg.contains("ストライク"));
    }

    #[test]
    fn test_sabr_error_non_finite_message() {
        let err = SABRError::NonFinite("implied_vol".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("implied_vol"));
        assert!(msg.contains("NaN"));
    }

    // ----------------------------------------------------------------
    // SABRParams validation tests
    // ----------------------------------------------------------------

    #[test]
    fn test_sabr_params_validation() {
        assert!(SABRParams::new(0.0, 0.2, 0.4, -0.3, 0.5, 1.0).is_err());
        assert!(SABRParams::new(0.03, 0.0, 0.4, -0.3, 0.5, 1.0).is_err());
        assert!(SABRParams::new(0.03, 0.2, -0.1, -0.3, 0.5, 1.0).is_err());
        assert!(SABRParams::new(0.03, 0.2, 0.4, 1.0, 0.5, 1.0).is_err());
        assert!(SABRParams::new(0.03, 0.2, 0.4, -1.0, 0.5, 1.0).is_err());
        assert!(SABRParams::new(0.03, 0.2, 0.4, 0.0, 1.1, 1.0).is_err());
        assert!(SABRParams::new(0.03, 0.2, 0.4, 0.0, 0.5, -1.0).is_err());
        // 境界値は有効
        assert!(SABRParams::new(0.03, 0.2, 0.0, 0.0, 0.0, 0.0).is_ok());
        assert!(SABRParams::new(0.03, 0.2, 0.4, 0.0, 1.0, 1.0).is_ok());
    }

    // ----------------------------------------------------------------
    // Hagan公式 tests
    // ----------------------------------------------------------------

    #[test]
    fn test_lognormal_without_vol_of_vol_is_flat() {
        // beta = 1, nu = 0 では σ = α (全ストライク)
        let m = SABRModel::new(SABRParams::new(0.03, 0.25, 0.0, 0.3, 1.0, 5.0).unwrap()).unwrap();
        for k in [0.01, 0.03, 0.08] {
            assert_relative_eq!(m.implied_vol(k).unwrap(), 0.25, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_atm_closed_form() {
        let m = model(0.5);
        let p = m.params();
        let f_pow = p.forward.powf(1.0 - p.beta);
        let expansion = 1.0
            + ((1.0 - p.beta).powi(2) * p.alpha * p.alpha / (24.0 * f_pow * f_pow)
                + p.rho * p.beta * p.nu * p.alpha / (4.0 * f_pow)
                + (2.0 - 3.0 * p.rho * p.rho) * p.nu * p.nu / 24.0)
                * p.maturity;
        assert_relative_eq!(
            m.atm_vol().unwrap(),
            p.alpha / f_pow * expansion,
            max_relative = 1e-13
        );
    }

    #[test]
    fn test_continuous_through_series_threshold() {
        let m = model(0.7);
        let f = m.params().forward;
        // 級数側 (|z| < 1e-5) と公式側をまたぐ
        let near = m.implied_vol(f * (1.0 - 1e-6)).unwrap();
        let far = m.implied_vol(f * (1.0 - 2e-6)).unwrap();
        let atm = m.atm_vol().unwrap();
        assert!((near - atm).abs() < 1e-6);
        assert!((far - near).abs() < 1e-6);
    }

    #[test]
    fn test_negative_rho_gives_downward_skew() {
        let m = model(1.0);
        assert!(m.implied_vol(0.02).unwrap() > m.implied_vol(0.04).unwrap());
    }

    #[test]
    fn test_invalid_strike() {
        assert_eq!(
            model(0.5).implied_vol(0.0),
            Err(SABRError::InvalidStrike(0.0))
        );
    }

    // ----------------------------------------------------------------
    // Adjoint tests
    // ----------------------------------------------------------------

    fn bumped(base: &SABRParams, which: usize, h: f64) -> SABRParams {
        let mut p = *base;
        match which {
            0 => p.forward += h,
            2 => p.alpha += h,
            3 => p.beta += h,
            4 => p.rho += h,
            _ => p.nu += h,
        }
        p
    }

    #[test]
    fn test_adjoint_matches_finite_differences() {
        let base = SABRParams::new(0.03, 0.04, 0.5, -0.25, 0.6, 3.0).unwrap();
        let m = SABRModel::new(base).unwrap();
        let h = 1e-6;
        for strike in [0.015, 0.03, 0.05] {
            let adj = m.implied_vol_adjoint(strike).unwrap();

            let d_strike = (m.implied_vol(strike + h).unwrap() - m.implied_vol(strike - h).unwrap())
                / (2.0 * h);
            assert_relative_eq!(adj.d_strike, d_strike, epsilon = 1e-5);

            let expected = [
                (0, adj.d_forward),
                (2, adj.d_alpha),
                (3, adj.d_beta),
                (4, adj.d_rho),
                (5, adj.d_nu),
            ];
            for (which, analytic) in expected {
                let up = SABRModel::new(bumped(&base, which, h)).unwrap();
                let down = SABRModel::new(bumped(&base, which, -h)).unwrap();
                let fd = (up.implied_vol(strike).unwrap() - down.implied_vol(strike).unwrap())
                    / (2.0 * h);
                assert_relative_eq!(analytic, fd, epsilon = 1e-5, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn test_adjoint_at_the_money_uses_series() {
        let m = model(0.5);
        let adj = m.implied_vol_adjoint(m.params().forward).unwrap();
        assert!(adj.d_nu.is_finite());
        assert!(adj.d_rho.is_finite());
        assert_relative_eq!(adj.vol, m.atm_vol().unwrap(), epsilon = 1e-15);
    }

    proptest! {
        #[test]
        fn prop_vol_positive_for_reasonable_params(
            k in 0.005f64..0.1,
            beta in 0.0f64..=1.0,
            rho in -0.8f64..0.8,
            nu in 0.0f64..1.0,
        ) {
            let params = SABRParams::new(0.03, 0.03f64.powf(1.0 - beta) * 0.3, nu, rho, beta, 1.0).unwrap();
            let vol = SABRModel::new(params).unwrap().implied_vol(k).unwrap();
            prop_assert!(vol > 0.0 && vol < 3.0);
        }
    }
}
